// src/renderer.rs

use crate::config::RenderConfig;
use crate::error::{MontageError, MontageResult};
use crate::model::{Revision, Snapshot};
use image::DynamicImage;
use log::{debug, trace};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// An external engine able to rasterize a local file
pub trait RenderEngine {
    /// Points the engine at a new target
    fn load(&mut self, target: &Path) -> MontageResult<()>;

    /// Picks up on-disk changes of the current target
    fn reload(&mut self) -> MontageResult<()>;

    /// Captures the current target
    fn screenshot(&mut self) -> MontageResult<DynamicImage>;

    fn quit(&mut self) {}
}

/// `file://` URL of `target`, percent-encoding everything but unreserved
/// characters and separators
fn file_url(target: &Path) -> String {
    let path = target.to_string_lossy();
    let mut url = String::with_capacity(path.len() + 7);
    url.push_str("file://");
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => url.push(byte as char),
            _ => url.push_str(&format!("%{byte:02X}")),
        }
    }
    url
}

pub fn is_browser_available(browser: &Path) -> bool {
    Command::new(browser)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Headless Chrome/Chromium, run once per screenshot.
///
/// Every capture starts a fresh browser process, so a reload is implied and
/// the page always reflects the working tree at capture time.
pub struct ChromeEngine {
    config: RenderConfig,
    scratch: TempDir,
    target: Option<PathBuf>,
    captures: usize,
}

impl ChromeEngine {
    pub fn launch(config: &RenderConfig) -> MontageResult<Self> {
        if !is_browser_available(&config.browser) {
            return Err(MontageError::render_engine(format!(
                "'{}' is required for rendering, but could not be run (is it installed and on PATH?)",
                config.browser.display()
            )));
        }

        let scratch = tempfile::Builder::new()
            .prefix("web-montage-")
            .tempdir()
            .map_err(|e| MontageError::render_engine(format!("failed to create capture directory: {e}")))?;
        debug!("Capturing into {}", scratch.path().display());

        Ok(Self {
            config: config.clone(),
            scratch,
            target: None,
            captures: 0,
        })
    }

    fn wait_for(&self, mut child: std::process::Child, url: &str) -> MontageResult<()> {
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => {
                    return Err(MontageError::render(url, format!("browser exited with {status}")));
                }
                Ok(None) if started.elapsed() >= self.config.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(MontageError::render(
                        url,
                        format!("timed out after {:?}", self.config.timeout),
                    ));
                }
                Ok(None) => thread::sleep(Duration::from_millis(25)),
                Err(e) => return Err(MontageError::render(url, format!("failed to wait for browser: {e}"))),
            }
        }
    }
}

impl RenderEngine for ChromeEngine {
    fn load(&mut self, target: &Path) -> MontageResult<()> {
        self.target = Some(target.to_path_buf());
        Ok(())
    }

    fn reload(&mut self) -> MontageResult<()> {
        Ok(())
    }

    fn screenshot(&mut self) -> MontageResult<DynamicImage> {
        let Some(target) = self.target.as_ref() else {
            return Err(MontageError::render("<none>", "no target loaded"));
        };
        let url = file_url(target);
        let out = self.scratch.path().join(format!("capture_{:06}.png", self.captures));
        self.captures += 1;

        let child = Command::new(&self.config.browser)
            .args(["--headless", "--disable-gpu", "--hide-scrollbars"])
            .arg(format!("--window-size={},{}", self.config.width, self.config.height))
            .arg(format!("--screenshot={}", out.display()))
            .arg(&url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MontageError::render(&url, format!("failed to spawn browser: {e}")))?;

        self.wait_for(child, &url)?;

        let image = image::open(&out).map_err(|e| MontageError::render(&url, e))?;
        if let Err(e) = std::fs::remove_file(&out) {
            trace!("Leaving {} for the scratch cleanup: {}", out.display(), e);
        }
        Ok(image)
    }
}

/// Owns a render engine for one run and numbers the captures
pub struct Renderer<E: RenderEngine> {
    engine: E,
    root: PathBuf,
    loaded: Option<PathBuf>,
    next_index: usize,
    closed: bool,
}

impl<E: RenderEngine> Renderer<E> {
    /// `root` is the directory revision paths are relative to
    pub fn new(engine: E, root: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            root: root.into(),
            loaded: None,
            next_index: 0,
            closed: false,
        }
    }

    /// Renders the file of `revision` as it currently is on disk.
    ///
    /// The first capture of a path loads it; later captures of the same path
    /// only reload.
    pub fn capture(&mut self, revision: &Revision) -> MontageResult<Snapshot> {
        let target = self.root.join(&revision.path);
        if self.loaded.as_deref() == Some(target.as_path()) {
            self.engine.reload()?;
        } else {
            debug!("Loading {}", file_url(&target));
            self.engine.load(&target)?;
            self.loaded = Some(target);
        }

        let image = self.engine.screenshot()?;
        let snapshot = Snapshot {
            index: self.next_index,
            revision: revision.id.clone(),
            image,
        };
        self.next_index += 1;
        Ok(snapshot)
    }

    pub fn captures(&self) -> usize {
        self.next_index
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.engine.quit();
        }
    }
}

impl<E: RenderEngine> Drop for Renderer<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::{GrayImage, Luma};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Calls {
        events: Vec<String>,
    }

    struct FakeEngine {
        calls: Rc<RefCell<Calls>>,
        fail_screenshot: bool,
    }

    impl RenderEngine for FakeEngine {
        fn load(&mut self, target: &Path) -> MontageResult<()> {
            self.calls.borrow_mut().events.push(format!("load {}", target.display()));
            Ok(())
        }

        fn reload(&mut self) -> MontageResult<()> {
            self.calls.borrow_mut().events.push("reload".into());
            Ok(())
        }

        fn screenshot(&mut self) -> MontageResult<DynamicImage> {
            if self.fail_screenshot {
                return Err(MontageError::render("fake", "blank page"));
            }
            self.calls.borrow_mut().events.push("shot".into());
            Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([7]))))
        }

        fn quit(&mut self) {
            self.calls.borrow_mut().events.push("quit".into());
        }
    }

    fn rev(id: &str, path: &str) -> Revision {
        Revision {
            id: id.into(),
            path: PathBuf::from(path),
            timestamp: 0,
            summary: String::new(),
        }
    }

    #[test]
    fn loads_once_then_reloads() {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let engine = FakeEngine { calls: calls.clone(), fail_screenshot: false };
        let mut renderer = Renderer::new(engine, "/site");

        let a = renderer.capture(&rev("a", "index.html")).unwrap();
        let b = renderer.capture(&rev("b", "index.html")).unwrap();
        let c = renderer.capture(&rev("c", "home.html")).unwrap();
        assert_eq!((a.index, b.index, c.index), (0, 1, 2));
        assert_eq!(c.revision, "c");
        renderer.close();

        assert_eq!(
            calls.borrow().events,
            vec![
                "load /site/index.html",
                "shot",
                "reload",
                "shot",
                "load /site/home.html",
                "shot",
                "quit"
            ]
        );
    }

    #[test]
    fn engine_quits_once_when_dropped_after_failure() {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let engine = FakeEngine { calls: calls.clone(), fail_screenshot: true };
        {
            let mut renderer = Renderer::new(engine, "/site");
            let err = renderer.capture(&rev("a", "index.html")).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Render);
            assert_eq!(renderer.captures(), 0);
        }
        let quits = calls.borrow().events.iter().filter(|e| e.as_str() == "quit").count();
        assert_eq!(quits, 1);
    }

    #[test]
    fn missing_browser_is_an_engine_error() {
        let config = RenderConfig {
            browser: PathBuf::from("/nonexistent/web-montage-browser"),
            ..RenderConfig::default()
        };
        let err = ChromeEngine::launch(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RenderEngine);
    }

    /// A stand-in browser: answers `--version`, then runs `body` for captures
    #[cfg(unix)]
    fn stub_browser(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("stub-browser");
        let script = format!("#!/bin/sh\ncase \"$1\" in --version) echo 'Stub 1.0'; exit 0;; esac\n{body}\n");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn screenshot_without_target_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig {
            browser: stub_browser(dir.path(), "exit 0"),
            ..RenderConfig::default()
        };
        let mut engine = ChromeEngine::launch(&config).unwrap();
        assert_eq!(engine.screenshot().unwrap_err().kind(), ErrorKind::Render);
    }

    #[cfg(unix)]
    #[test]
    fn hung_browser_is_killed_at_the_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig {
            browser: stub_browser(dir.path(), "exec sleep 30"),
            timeout: Duration::from_millis(300),
            ..RenderConfig::default()
        };
        let mut engine = ChromeEngine::launch(&config).unwrap();
        engine.load(Path::new("/site/index.html")).unwrap();

        let started = Instant::now();
        let err = engine.screenshot().unwrap_err();
        let elapsed = started.elapsed();

        assert_eq!(err.kind(), ErrorKind::Render);
        assert!(err.to_string().contains("timed out"), "{err}");
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    }

    #[cfg(unix)]
    #[test]
    fn failing_browser_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig {
            browser: stub_browser(dir.path(), "exit 3"),
            ..RenderConfig::default()
        };
        let mut engine = ChromeEngine::launch(&config).unwrap();
        engine.load(Path::new("/site/index.html")).unwrap();

        let err = engine.screenshot().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);
        assert!(err.to_string().contains("file:///site/index.html"));
    }

    #[test]
    fn file_urls_escape_reserved_characters() {
        assert_eq!(file_url(Path::new("/site/index.html")), "file:///site/index.html");
        assert_eq!(
            file_url(Path::new("/tmp/my site/#1?draft%.html")),
            "file:///tmp/my%20site/%231%3Fdraft%25.html"
        );
    }
}
