//! Mock collaborators: a recording display sink and a fixed-frame camera

use std::sync::{Arc, Mutex};
use vision_rs::capture::CaptureDevice;
use vision_rs::display::DisplaySink;
use vision_rs::Frame;

/// One call made on a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Show(String),
    Close(String),
    CloseAll,
}

/// Display sink that records every call into a shared log
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn shown(&self, key: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Show(k) if k == key))
            .count()
    }

    pub fn closed(&self, key: &str) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, SinkEvent::Close(k) if k == key))
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl DisplaySink for RecordingSink {
    fn show(&mut self, key: &str, _frame: &Frame) {
        self.events.lock().unwrap().push(SinkEvent::Show(key.to_string()));
    }

    fn close(&mut self, key: &str) {
        self.events.lock().unwrap().push(SinkEvent::Close(key.to_string()));
    }

    fn close_all(&mut self) {
        self.events.lock().unwrap().push(SinkEvent::CloseAll);
    }
}

/// Camera that always returns the same frame
pub struct StillCamera {
    frame: Frame,
    pub rate: Arc<Mutex<Option<u32>>>,
}

impl StillCamera {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            rate: Arc::new(Mutex::new(None)),
        }
    }
}

impl CaptureDevice for StillCamera {
    fn read(&mut self) -> Frame {
        std::thread::sleep(std::time::Duration::from_millis(2));
        self.frame.clone()
    }

    fn set_rate(&mut self, fps: u32) {
        *self.rate.lock().unwrap() = Some(fps);
    }

    fn describe(&self) -> String {
        "still camera".to_string()
    }
}
