//! # Rodio 后端
//!
//! 使用 rodio 的 `SpatialSink` 输出空间音效。支持 MP3, WAV, FLAC, OGG 格式。
//!
//! 每次播放创建新的 sink（停止过的 sink 不能复用），
//! 音源后面追加一个回调音源，播放到它时发出"播放结束"信号。

use super::backend::{AudioBackend, AudioError, Emitter, EndSignal, PlaybackHandle, SoundAsset};
use glam::Vec3;
use rodio::source::EmptyCallback;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Source, SpatialSink};
use std::cell::Cell;
use std::io::Cursor;
use std::rc::Rc;
use std::sync::Arc;
use tracing::info;

/// 双耳相对听者位置的偏移
const EAR_OFFSET: f32 = 0.2;

fn ears(listener: Vec3) -> ([f32; 3], [f32; 3]) {
    (
        (listener - Vec3::X * EAR_OFFSET).to_array(),
        (listener + Vec3::X * EAR_OFFSET).to_array(),
    )
}

/// rodio 后端
pub struct RodioBackend {
    /// 音频输出流（必须保持存活）
    _stream: OutputStream,
    /// 音频输出句柄
    stream_handle: OutputStreamHandle,
    listener: Rc<Cell<Vec3>>,
}

impl RodioBackend {
    /// 打开默认输出设备
    pub fn new() -> Result<Self, AudioError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| AudioError::Output(e.to_string()))?;

        info!("rodio 音频输出已初始化");
        Ok(Self {
            _stream: stream,
            stream_handle,
            listener: Rc::new(Cell::new(Vec3::ZERO)),
        })
    }
}

impl AudioBackend for RodioBackend {
    fn name(&self) -> &'static str {
        "rodio"
    }

    fn instantiate(&mut self, asset: &SoundAsset) -> Result<Box<dyn PlaybackHandle>, AudioError> {
        // 先解码一次，确认格式可用
        Decoder::new(Cursor::new(Arc::clone(&asset.bytes))).map_err(|e| AudioError::Decode {
            key: asset.key.clone(),
            message: e.to_string(),
        })?;

        Ok(Box::new(RodioHandle {
            key: asset.key.clone(),
            bytes: Arc::clone(&asset.bytes),
            stream_handle: self.stream_handle.clone(),
            listener: Rc::clone(&self.listener),
            emitter: Emitter::non_spatial(),
            volume: 1.0,
            sink: None,
        }))
    }

    fn set_listener(&mut self, position: Vec3) {
        self.listener.set(position);
    }

    fn listener(&self) -> Vec3 {
        self.listener.get()
    }
}

struct RodioHandle {
    key: String,
    bytes: Arc<[u8]>,
    stream_handle: OutputStreamHandle,
    listener: Rc<Cell<Vec3>>,
    emitter: Emitter,
    volume: f32,
    sink: Option<SpatialSink>,
}

impl RodioHandle {
    /// 非空间化音源放在听者位置上
    fn emitter_position(&self) -> [f32; 3] {
        self.emitter
            .position
            .unwrap_or_else(|| self.listener.get())
            .to_array()
    }

    fn apply(&self) {
        let Some(sink) = &self.sink else {
            return;
        };
        let listener = self.listener.get();
        let (left, right) = ears(listener);
        sink.set_left_ear_position(left);
        sink.set_right_ear_position(right);
        sink.set_emitter_position(self.emitter_position());
        sink.set_volume(self.volume * self.emitter.attenuation(listener));
    }
}

impl PlaybackHandle for RodioHandle {
    fn set_emitter(&mut self, emitter: Emitter) {
        self.emitter = emitter;
        self.apply();
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.apply();
    }

    fn play(&mut self, looping: bool, on_end: EndSignal) -> Result<(), AudioError> {
        self.stop();

        let playback_error = |message: String| AudioError::Playback {
            key: self.key.clone(),
            message,
        };

        let source = Decoder::new(Cursor::new(Arc::clone(&self.bytes)))
            .map_err(|e| playback_error(e.to_string()))?;

        let (left, right) = ears(self.listener.get());
        let sink = SpatialSink::try_new(&self.stream_handle, self.emitter_position(), left, right)
            .map_err(|e| playback_error(e.to_string()))?;

        if looping {
            sink.append(source.buffered().repeat_infinite());
        } else {
            sink.append(source);
            sink.append(EmptyCallback::<f32>::new(Box::new(move || on_end.fire())));
        }

        self.sink = Some(sink);
        self.apply();
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn signals_end(&self) -> bool {
        true
    }
}
