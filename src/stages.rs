use crate::tags::Tags;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} failed with {status}{}", stderr_suffix(.stderr))]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: Option<String>,
    },
    #[error("{program} output is not valid utf-8")]
    InvalidOutput { program: String },
}

fn stderr_suffix(stderr: &Option<String>) -> String {
    stderr
        .as_deref()
        .map(|line| format!(": {line}"))
        .unwrap_or_default()
}

/// The three external steps a conversion is made of.
pub trait Stages: Send + Sync {
    fn extract_tags(&self, source: &Path) -> Result<Tags, StageError>;

    /// Decodes `source` into the already created file at `artifact`.
    fn decode(&self, source: &Path, artifact: &Path) -> Result<(), StageError>;

    fn encode(&self, artifact: &Path, destination: &Path, tags: &Tags) -> Result<(), StageError>;
}

/// Program paths for the external tools and the encoder's pass-through args.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalTools {
    pub metaflac: PathBuf,
    pub flac: PathBuf,
    pub lame: PathBuf,
    pub lame_args: Vec<String>,
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self {
            metaflac: PathBuf::from("metaflac"),
            flac: PathBuf::from("flac"),
            lame: PathBuf::from("lame"),
            lame_args: default_lame_args(),
        }
    }
}

pub fn default_lame_args() -> Vec<String> {
    ["-q", "2", "--vbr-new", "-b", "192", "-B", "320", "--preset", "extreme"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Stages for ExternalTools {
    fn extract_tags(&self, source: &Path) -> Result<Tags, StageError> {
        let mut cmd = Command::new(&self.metaflac);
        cmd.args(["--export-tags-to=-", "--no-utf8-convert"]).arg(source);
        let output = run(cmd, &self.metaflac, true)?;
        let text = String::from_utf8(output.stdout).map_err(|_| StageError::InvalidOutput {
            program: program_name(&self.metaflac),
        })?;
        Ok(Tags::parse(&text))
    }

    fn decode(&self, source: &Path, artifact: &Path) -> Result<(), StageError> {
        let mut cmd = Command::new(&self.flac);
        cmd.args(["-f", "-d"]).arg(source).arg("-o").arg(artifact);
        run(cmd, &self.flac, false)?;
        Ok(())
    }

    fn encode(&self, artifact: &Path, destination: &Path, tags: &Tags) -> Result<(), StageError> {
        let mut cmd = Command::new(&self.lame);
        cmd.args(&self.lame_args);
        for (flag, key) in [
            ("--ta", "artist"),
            ("--tt", "title"),
            ("--tg", "genre"),
            ("--tl", "album"),
            ("--tn", "tracknumber"),
            ("--ty", "date"),
        ] {
            cmd.arg(flag).arg(tags.get(key).unwrap_or_default());
        }
        cmd.arg(artifact).arg(destination);
        run(cmd, &self.lame, false)?;
        Ok(())
    }
}

fn run(mut cmd: Command, program: &Path, capture_stdout: bool) -> Result<Output, StageError> {
    let stdout = if capture_stdout {
        Stdio::piped()
    } else {
        Stdio::null()
    };
    tracing::debug!(command = ?cmd, "running stage");
    let output = cmd
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| StageError::Spawn {
            program: program_name(program),
            source,
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr)
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(String::from);
        return Err(StageError::Failed {
            program: program_name(program),
            status: output.status,
            stderr,
        });
    }
    Ok(output)
}

fn program_name(program: &Path) -> String {
    program
        .file_name()
        .unwrap_or(program.as_os_str())
        .to_string_lossy()
        .into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    #[test]
    fn extract_tags_parses_tool_output() -> Result<()> {
        let dir = tempdir()?;
        let tools = ExternalTools {
            metaflac: script(dir.path(), "metaflac", "printf 'ARTIST=Bob\\ntitle=Hi\"There\\n'")?,
            ..ExternalTools::default()
        };
        let tags = tools.extract_tags(Path::new("song.flac"))?;
        assert_eq!(tags.get("artist"), Some("Bob"));
        assert_eq!(tags.get("title"), Some("Hi'There"));
        Ok(())
    }

    #[test]
    fn non_zero_exit_carries_last_stderr_line() -> Result<()> {
        let dir = tempdir()?;
        let tools = ExternalTools {
            flac: script(dir.path(), "flac", "echo starting >&2\necho 'bad header' >&2\nexit 3")?,
            ..ExternalTools::default()
        };
        let err = tools
            .decode(Path::new("song.flac"), &dir.path().join("out.wav"))
            .expect_err("decode should fail");
        match &err {
            StageError::Failed { program, stderr, .. } => {
                assert_eq!(program, "flac");
                assert_eq!(stderr.as_deref(), Some("bad header"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().ends_with(": bad header"));
        Ok(())
    }

    #[test]
    fn encode_passes_args_tags_and_paths() -> Result<()> {
        let dir = tempdir()?;
        let log = dir.path().join("args.txt");
        let body = format!("for a in \"$@\"; do echo \"$a\" >> '{}'; done", log.display());
        let tools = ExternalTools {
            lame: script(dir.path(), "lame", &body)?,
            lame_args: vec!["-V0".to_string()],
            ..ExternalTools::default()
        };
        let tags = Tags::parse("ARTIST=Bob\nTITLE=Hi\nGENRE=Pop\nALBUM=One\nTRACKNUMBER=1\nDATE=2001");
        tools.encode(Path::new("in.wav"), Path::new("out.mp3"), &tags)?;
        let args: Vec<String> = fs::read_to_string(&log)?.lines().map(String::from).collect();
        assert_eq!(
            args,
            [
                "-V0", "--ta", "Bob", "--tt", "Hi", "--tg", "Pop", "--tl", "One", "--tn", "1",
                "--ty", "2001", "in.wav", "out.mp3"
            ]
        );
        Ok(())
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let tools = ExternalTools {
            metaflac: PathBuf::from("/nonexistent/metaflac"),
            ..ExternalTools::default()
        };
        let err = tools
            .extract_tags(Path::new("song.flac"))
            .expect_err("spawn should fail");
        assert!(matches!(err, StageError::Spawn { .. }));
    }
}
