//! Background thread for async image decoding.
//!
//! `NativeDecoderThread` reads image headers on a worker thread so the engine
//! thread never blocks on file IO. Only dimensions are decoded; pixels are
//! the renderer's concern.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use image::ImageReader;

use super::{DecodeError, DecodeOutcome, ImageDecoder, ImageSource};
use crate::model::ImageId;

/// Request to decode an image, sent to the background thread.
struct DecodeRequest {
    id: ImageId,
    source: ImageSource,
}

/// Message sent to the decoder thread.
enum ThreadMessage {
    /// Decode an image
    Decode(DecodeRequest),
    /// Shutdown the thread
    Shutdown,
}

/// Manages a background thread for async image decoding.
pub struct NativeDecoderThread {
    /// Sender for requests to the background thread
    request_tx: Sender<ThreadMessage>,
    /// Receiver for results from the background thread
    result_rx: Receiver<DecodeOutcome>,
    /// Handle to the background thread (for joining on drop)
    thread_handle: Option<JoinHandle<()>>,
    /// Ids of requests without a result yet
    pending: HashSet<ImageId>,
}

impl NativeDecoderThread {
    /// Spawn a new decoder thread.
    pub fn spawn() -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<ThreadMessage>();
        let (result_tx, result_rx) = mpsc::channel::<DecodeOutcome>();

        let thread_handle = thread::Builder::new()
            .name("image-decoder".to_string())
            .spawn(move || {
                log::debug!("Image decoder thread started");
                Self::thread_loop(request_rx, result_tx);
                log::debug!("Image decoder thread exiting");
            })?;

        log::info!("Image decoder thread spawned");

        Ok(Self {
            request_tx,
            result_rx,
            thread_handle: Some(thread_handle),
            pending: HashSet::new(),
        })
    }

    /// Background thread main loop.
    fn thread_loop(request_rx: Receiver<ThreadMessage>, result_tx: Sender<DecodeOutcome>) {
        loop {
            match request_rx.recv() {
                Ok(ThreadMessage::Decode(request)) => {
                    let outcome = match decode_dimensions(&request.source) {
                        Ok((width, height)) => {
                            log::debug!("Decoded image {}: {}x{}", request.id, width, height);
                            DecodeOutcome::Decoded {
                                id: request.id,
                                width,
                                height,
                            }
                        }
                        Err(error) => {
                            log::debug!("Failed to decode image {}: {}", request.id, error);
                            DecodeOutcome::Failed {
                                id: request.id,
                                error,
                            }
                        }
                    };
                    if result_tx.send(outcome).is_err() {
                        log::warn!("Result channel closed, decoder thread exiting");
                        break;
                    }
                }
                Ok(ThreadMessage::Shutdown) => {
                    log::debug!("Received shutdown signal");
                    break;
                }
                Err(_) => {
                    log::debug!("Request channel closed, decoder thread exiting");
                    break;
                }
            }
        }
    }

    /// Block until the next result arrives. Returns `None` when nothing is
    /// pending or the thread is gone.
    pub fn wait_one(&mut self) -> Option<DecodeOutcome> {
        if self.pending.is_empty() {
            return None;
        }
        match self.result_rx.recv() {
            Ok(outcome) => {
                self.pending.remove(&outcome.id());
                Some(outcome)
            }
            Err(_) => {
                log::warn!("Decoder thread disconnected");
                None
            }
        }
    }

    /// Check if a specific image has a pending request.
    pub fn is_pending(&self, id: ImageId) -> bool {
        self.pending.contains(&id)
    }
}

impl ImageDecoder for NativeDecoderThread {
    fn request_decode(&mut self, id: ImageId, source: ImageSource) {
        self.pending.insert(id);

        if self
            .request_tx
            .send(ThreadMessage::Decode(DecodeRequest { id, source }))
            .is_err()
        {
            log::error!("Failed to send decode request: channel closed");
        } else {
            log::debug!("Sent decode request {}", id);
        }
    }

    fn poll(&mut self) -> Option<DecodeOutcome> {
        match self.result_rx.try_recv() {
            Ok(outcome) => {
                self.pending.remove(&outcome.id());
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Decoder thread disconnected");
                None
            }
        }
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for NativeDecoderThread {
    fn drop(&mut self) {
        log::debug!("Shutting down image decoder thread");

        let _ = self.request_tx.send(ThreadMessage::Shutdown);

        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Decoder thread panicked: {:?}", e);
            }
        }
    }
}

/// Read the pixel dimensions of an encoded image.
pub fn decode_dimensions(source: &ImageSource) -> Result<(u32, u32), DecodeError> {
    let dims = match source {
        ImageSource::Path(path) => ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()?,
        ImageSource::Bytes(bytes) => ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_dimensions()?,
    };
    Ok(dims)
}
