//! Test fixtures: frames, frame sources and classifiers.

use std::collections::VecDeque;
use std::net::SocketAddr;

use bmp_reduce::{encode, identity_palette, Geometry, TARGET_PIXELS};
use tinycam::models::{AppConfig, ClassLabel, Credentials};
use tinycam::server::FrameServer;
use tinycam::services::{Classifier, FrameSource, InferenceError, SyntheticSource};

pub const USER: &str = "tester";
pub const PASSWORD: &str = "s3cret";

pub fn credentials() -> Credentials {
    Credentials::new(USER, PASSWORD)
}

/// Config with test credentials and no delay between frames
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.credentials = credentials();
    config.server.frame_interval_secs = 0;
    config.server.auth_timeout_secs = 1;
    config
}

/// 96x96 frame where storage pixel (x, y) has value `f(x, y)`
pub fn source_frame(f: impl Fn(usize, usize) -> u8) -> Vec<u8> {
    let mut pixels = vec![0u8; 96 * 96];
    for y in 0..96 {
        for x in 0..96 {
            pixels[y * 96 + x] = f(x, y);
        }
    }
    encode(Geometry::SOURCE, &identity_palette(), &pixels).unwrap()
}

/// Always reports the same class with high confidence.
pub struct FixedClassifier(pub ClassLabel);

impl Classifier for FixedClassifier {
    fn run(
        &mut self,
        _pixels: &[u8; TARGET_PIXELS],
        out: &mut [f32],
    ) -> Result<(), InferenceError> {
        out.fill(0.1);
        out[self.0.index()] = 0.9;
        Ok(())
    }

    fn classes(&self) -> usize {
        ClassLabel::COUNT
    }
}

/// Plays back a fixed script of capture results, then synthetic frames.
pub struct ScriptedSource {
    script: VecDeque<Option<Vec<u8>>>,
    fallback: SyntheticSource,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Option<Vec<u8>>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: SyntheticSource::new(),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn capture(&mut self) -> Option<Vec<u8>> {
        match self.script.pop_front() {
            Some(result) => result,
            None => self.fallback.capture(),
        }
    }
}

/// Start a server on an available port and return its address.
pub async fn start_server(source: Box<dyn FrameSource>, label: ClassLabel) -> SocketAddr {
    let server = FrameServer::new(&test_config(), source, Box::new(FixedClassifier(label)))
        .expect("Failed to create server");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        server.serve(listener).await.ok();
    });

    addr
}
