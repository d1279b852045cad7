use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{debug, info, warn};

use super::MetadataSource;
use crate::error::{Error, Result};
use crate::filter::FilterConfig;
use crate::metadata::MetadataRecord;

/// Line exiftool prints after finishing each `-execute`.
const SENTINEL: &str = "{ready}";

/// Arguments selecting the date tags worth reading for `filter`.
pub fn query_args(filter: &FilterConfig) -> Vec<String> {
    let mut args: Vec<String> = vec!["-j".into(), "-a".into(), "-G".into()];

    let mut tags: Vec<&str> = filter.allowed_tags().collect();
    let mut groups: Vec<&str> = filter.allowed_groups().collect();
    if !tags.is_empty() {
        tags.sort_unstable();
        args.extend(tags.into_iter().map(|t| format!("-{t}")));
    } else if !groups.is_empty() {
        groups.sort_unstable();
        args.extend(groups.into_iter().map(|g| format!("-{g}:Time:All")));
    } else {
        args.push("-time:all".into());
    }
    args
}

/// A long-running `exiftool -stay_open` process fed one file at a time.
pub struct ExifTool {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    args: Vec<String>,
}

impl ExifTool {
    /// Start `executable` and make sure it answers.
    pub fn spawn(executable: &Path, filter: &FilterConfig) -> Result<Self> {
        let mut child = Command::new(executable)
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::ExifTool(format!("failed to start {}: {}", executable.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::ExifTool("stdin pipe not available".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ExifTool("stdout pipe not available".into()))?;

        let mut tool = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            args: query_args(filter),
        };

        let version = tool.execute(&["-ver".to_string()])?;
        if version.trim().is_empty() {
            return Err(Error::ExifTool("health check returned no version".into()));
        }
        info!("Using ExifTool {}", version.trim());
        Ok(tool)
    }

    /// Run one command and return everything printed before the sentinel.
    fn execute(&mut self, args: &[String]) -> Result<String> {
        let mut request = String::new();
        for arg in args {
            if arg.contains('\n') {
                return Err(Error::ExifTool(format!("argument contains a newline: {arg:?}")));
            }
            request.push_str(arg);
            request.push('\n');
        }
        request.push_str("-execute\n");
        self.stdin.write_all(request.as_bytes())?;
        self.stdin.flush()?;

        let mut output = String::new();
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(Error::ExifTool("process exited unexpectedly".into()));
            }
            if line.trim_end() == SENTINEL {
                break;
            }
            output.push_str(&line);
        }
        Ok(output)
    }
}

impl MetadataSource for ExifTool {
    fn extract(&mut self, path: &Path) -> Result<Option<MetadataRecord>> {
        let mut args = self.args.clone();
        args.push(path.to_string_lossy().into_owned());
        let raw = self.execute(&args)?;
        let mut records = MetadataRecord::parse_exiftool_output(&raw)?;
        debug!("exiftool returned {} record(s) for {}", records.len(), path.display());
        if records.is_empty() {
            return Ok(None);
        }
        let mut record = records.swap_remove(0);
        if record.source() != path {
            // Keep the path we walked so reports line up with enumeration.
            let mut renamed = MetadataRecord::new(PathBuf::from(path));
            for (key, value) in record.tags() {
                renamed.insert(key, value.clone());
            }
            record = renamed;
        }
        Ok(Some(record))
    }
}

impl Drop for ExifTool {
    fn drop(&mut self) {
        let _ = self.stdin.write_all(b"-stay_open\nFalse\n");
        let _ = self.stdin.flush();
        if let Err(e) = self.child.wait() {
            warn!("exiftool did not exit cleanly: {}", e);
        }
    }
}
