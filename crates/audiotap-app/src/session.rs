//! Playback session
//!
//! One user action end to end: gate the file, optionally upload it, then
//! initialize the engine and load the bytes. Upload failure aborts before
//! the engine is touched.

use std::fs;
use std::path::Path;

use audiotap::audio::{hint_for_mime, AudioEngine, CodecInfo};
use tracing::info;

use crate::data::Settings;
use crate::error::Result;
use crate::gate;
use crate::network::HttpClient;

pub struct Session {
    engine: AudioEngine,
    settings: Settings,
    client: Option<HttpClient>,
    last_upload: Option<serde_json::Value>,
}

impl Session {
    /// Session playing through the default output device
    pub fn new(settings: Settings) -> Result<Self> {
        let engine = AudioEngine::with_config(settings.engine_config()?);
        Self::with_engine(settings, engine)
    }

    /// Session around an already-constructed engine
    pub fn with_engine(settings: Settings, engine: AudioEngine) -> Result<Self> {
        let client = if settings.upload_before_play {
            Some(HttpClient::new()?)
        } else {
            None
        };
        Ok(Self {
            engine,
            settings,
            client,
            last_upload: None,
        })
    }

    /// Gate, read and open a file from disk
    pub fn open_file(&mut self, path: &Path) -> Result<CodecInfo> {
        let mime = gate::check_path(path)?;
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        self.open_bytes(file_name, mime, bytes)
    }

    /// Gate, upload if configured, then initialize and load
    pub fn open_bytes(&mut self, file_name: &str, mime: &str, bytes: Vec<u8>) -> Result<CodecInfo> {
        gate::validate_mime(mime)?;

        if let Some(client) = &self.client {
            let response = client.upload(&self.settings.server_url, file_name, mime, bytes.clone())?;
            info!(file = file_name, "upload accepted");
            self.last_upload = Some(response);
        }

        self.engine.initialize()?;
        let codec = self.engine.load_with_hint(bytes, hint_for_mime(mime))?;
        info!(file = file_name, codec = %codec, "ready to play");
        Ok(codec)
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AudioEngine {
        &mut self.engine
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// JSON body of the most recent successful upload
    pub fn last_upload(&self) -> Option<&serde_json::Value> {
        self.last_upload.as_ref()
    }
}
