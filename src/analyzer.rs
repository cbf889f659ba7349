//! Running the external pose analyzer and checking what it left behind.

use crate::error::Error;
use indicatif::ProgressBar;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant, SystemTime},
};
use tracing::{debug, info, warn};

const DEFAULT_PROGRAM: &str = "node";
const DEFAULT_SCRIPT: &str = "analyze.js";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

// coarse filesystem timestamps can trail the wall clock
const MTIME_SLACK: Duration = Duration::from_secs(2);

fn parse_seconds(s: &str) -> Result<Duration, std::num::ParseIntError> {
    s.parse().map(Duration::from_secs)
}

#[derive(Debug, Clone, structopt::StructOpt)]
pub struct Analyzer {
    /// Program that runs the pose analyzer.
    #[structopt(long = "analyzer", default_value = DEFAULT_PROGRAM, env = "POSE_ANALYZER")]
    pub program: PathBuf,

    /// Argument passed to the analyzer ahead of the video path. May be repeated.
    #[structopt(long = "analyzer-arg", default_value = DEFAULT_SCRIPT, number_of_values = 1)]
    pub args: Vec<String>,

    /// Have the analyzer sample every Nth frame.
    #[structopt(long)]
    pub skip: Option<u32>,

    /// Kill the analyzer if it runs longer than this many seconds.
    #[structopt(long = "timeout-secs", parse(try_from_str = parse_seconds))]
    pub timeout: Option<Duration>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            args: vec![DEFAULT_SCRIPT.to_owned()],
            skip: None,
            timeout: None,
        }
    }
}

/// The file an analyzer writes for `video`: the video path with `.json` appended.
pub fn output_path<P>(video: P) -> PathBuf
where
    P: AsRef<Path>,
{
    let mut path = OsString::from(video.as_ref().as_os_str());
    path.push(".json");
    PathBuf::from(path)
}

impl Analyzer {
    pub fn new<P>(program: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            program: program.into(),
            args: vec![],
            skip: None,
            timeout: None,
        }
    }

    fn command(&self, video: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(video);
        if let Some(skip) = self.skip {
            command.arg(skip.to_string());
        }
        // keep our stdout free for the normalized output
        command.stdin(Stdio::null()).stdout(std::io::stderr());
        command
    }

    /// Run the analyzer on `video`, block until it exits, and return the path of
    /// the analysis it wrote.
    ///
    /// Clearing `running` kills the analyzer and returns [`Error::Interrupted`].
    pub fn run(
        &self,
        video: &Path,
        running: &AtomicBool,
        progress: Option<&ProgressBar>,
    ) -> Result<PathBuf, Error> {
        let output = output_path(video);
        let started = SystemTime::now();

        info!(
            message = "starting pose analyzer",
            program = %self.program.display(),
            video = %video.display()
        );
        let child = self
            .command(video)
            .spawn()
            .map_err(|e| Error::SpawnAnalyzer(e, self.program.clone()))?;

        let status = self.wait(child, running, progress)?;
        info!(message = "pose analyzer exited", %status);
        if !status.success() {
            return Err(Error::AnalyzerFailed(status));
        }

        check_output(&output, started)?;
        Ok(output)
    }

    fn wait(
        &self,
        mut child: Child,
        running: &AtomicBool,
        progress: Option<&ProgressBar>,
    ) -> Result<ExitStatus, Error> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(Error::WaitAnalyzer)? {
                return Ok(status);
            }

            if !running.load(Ordering::SeqCst) {
                kill(&mut child)?;
                return Err(Error::Interrupted);
            }

            let elapsed = start.elapsed();
            if let Some(timeout) = self.timeout {
                if elapsed >= timeout {
                    kill(&mut child)?;
                    return Err(Error::AnalyzerTimeout(timeout));
                }
            }

            if let Some(progress) = progress {
                progress.set_message(format!("analyzing ({:.0}s)", elapsed.as_secs_f64()));
                progress.tick();
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

fn kill(child: &mut Child) -> Result<(), Error> {
    warn!(message = "killing pose analyzer", pid = child.id());
    child.kill().map_err(Error::KillAnalyzer)?;
    child.wait().map_err(Error::WaitAnalyzer)?;
    Ok(())
}

/// Make sure the analyzer actually produced a fresh, non-empty file at `path`.
pub fn check_output(path: &Path, started: SystemTime) -> Result<(), Error> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::MissingAnalyzerOutput(path.to_path_buf()))
        }
        Err(e) => return Err(Error::StatAnalyzerOutput(e, path.to_path_buf())),
    };

    if !metadata.is_file() {
        return Err(Error::MissingAnalyzerOutput(path.to_path_buf()));
    }

    if metadata.len() == 0 {
        return Err(Error::EmptyAnalyzerOutput(path.to_path_buf()));
    }

    // some platforms don't record modification times; skip the check there
    if let Ok(modified) = metadata.modified() {
        if modified + MTIME_SLACK < started {
            return Err(Error::StaleAnalyzerOutput(path.to_path_buf()));
        }
    }

    debug!(message = "analyzer output looks good", path = %path.display(), bytes = metadata.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_output, output_path, Analyzer};
    use crate::error::Error;
    use std::{
        path::{Path, PathBuf},
        sync::atomic::AtomicBool,
        time::{Duration, Instant, SystemTime},
    };

    #[test]
    fn output_path_appends_json() {
        assert_eq!(
            output_path("videos/vid1.MOV"),
            PathBuf::from("videos/vid1.MOV.json")
        );
    }

    #[test]
    fn default_runs_node_script() {
        let analyzer = Analyzer::default();
        assert_eq!(analyzer.program, Path::new("node"));
        assert_eq!(analyzer.args, vec!["analyze.js".to_owned()]);
        assert!(analyzer.timeout.is_none());
    }

    #[test]
    fn missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_output(&dir.path().join("vid.json"), SystemTime::now()).unwrap_err();
        assert!(matches!(err, Error::MissingAnalyzerOutput(_)));
        assert!(err.is_external_tool());
    }

    #[test]
    fn empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vid.json");
        std::fs::write(&path, "").unwrap();
        let err = check_output(&path, SystemTime::now()).unwrap_err();
        assert!(matches!(err, Error::EmptyAnalyzerOutput(_)));
    }

    #[test]
    fn stale_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vid.json");
        std::fs::write(&path, "{}").unwrap();
        let err = check_output(&path, SystemTime::now() + Duration::from_secs(3600)).unwrap_err();
        assert!(matches!(err, Error::StaleAnalyzerOutput(_)));
    }

    #[test]
    fn fresh_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vid.json");
        let started = SystemTime::now();
        std::fs::write(&path, "{}").unwrap();
        check_output(&path, started).unwrap();
    }

    #[test]
    fn spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = Analyzer::new(dir.path().join("no-such-analyzer"));
        let err = analyzer
            .run(&dir.path().join("vid.mov"), &AtomicBool::new(true), None)
            .unwrap_err();
        assert!(matches!(err, Error::SpawnAnalyzer(..)));
        assert!(err.is_external_tool());
    }

    #[cfg(unix)]
    mod process_tests {
        use super::*;

        /// `sh -c script video [skip]` puts the video path in `$0`.
        fn shell(script: &str) -> Analyzer {
            let mut analyzer = Analyzer::new("/bin/sh");
            analyzer.args = vec!["-c".to_owned(), script.to_owned()];
            analyzer
        }

        #[test]
        fn writes_analysis() {
            let dir = tempfile::tempdir().unwrap();
            let video = dir.path().join("vid1.MOV");
            let analyzer =
                shell(r#"printf '%s' '{"video": {}, "poses": []}' > "$0.json""#);
            let output = analyzer.run(&video, &AtomicBool::new(true), None).unwrap();
            assert_eq!(output, dir.path().join("vid1.MOV.json"));
            assert_eq!(
                std::fs::read_to_string(output).unwrap(),
                r#"{"video": {}, "poses": []}"#
            );
        }

        #[test]
        fn forwards_skip_rate() {
            let dir = tempfile::tempdir().unwrap();
            let video = dir.path().join("vid1.MOV");
            let mut analyzer = shell(r#"printf '%s' "$1" > "$0.json""#);
            analyzer.skip = Some(3);
            let output = analyzer.run(&video, &AtomicBool::new(true), None).unwrap();
            assert_eq!(std::fs::read_to_string(output).unwrap(), "3");
        }

        #[test]
        fn nonzero_exit() {
            let dir = tempfile::tempdir().unwrap();
            let err = shell("exit 3")
                .run(&dir.path().join("vid.mov"), &AtomicBool::new(true), None)
                .unwrap_err();
            match err {
                Error::AnalyzerFailed(status) => assert_eq!(status.code(), Some(3)),
                other => panic!("expected analyzer failure, got {:?}", other),
            }
        }

        #[test]
        fn success_without_output() {
            let dir = tempfile::tempdir().unwrap();
            let err = shell("true")
                .run(&dir.path().join("vid.mov"), &AtomicBool::new(true), None)
                .unwrap_err();
            assert!(matches!(err, Error::MissingAnalyzerOutput(_)));
        }

        #[test]
        fn success_with_empty_output() {
            let dir = tempfile::tempdir().unwrap();
            let err = shell(r#": > "$0.json""#)
                .run(&dir.path().join("vid.mov"), &AtomicBool::new(true), None)
                .unwrap_err();
            assert!(matches!(err, Error::EmptyAnalyzerOutput(_)));
        }

        #[test]
        fn times_out() {
            let dir = tempfile::tempdir().unwrap();
            let mut analyzer = shell("sleep 10");
            analyzer.timeout = Some(Duration::from_millis(200));
            let start = Instant::now();
            let err = analyzer
                .run(&dir.path().join("vid.mov"), &AtomicBool::new(true), None)
                .unwrap_err();
            assert!(matches!(err, Error::AnalyzerTimeout(_)));
            assert!(start.elapsed() < Duration::from_secs(5));
        }

        #[test]
        fn interrupted() {
            let dir = tempfile::tempdir().unwrap();
            let err = shell("sleep 10")
                .run(&dir.path().join("vid.mov"), &AtomicBool::new(false), None)
                .unwrap_err();
            assert!(matches!(err, Error::Interrupted));
        }
    }
}
