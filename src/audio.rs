use crate::profile::clamp01;
use std::{
    io,
    path::PathBuf,
    time::Duration,
};
use tokio::time::{
    self,
    Instant,
};
use tracing::{
    debug,
    warn,
};

pub const FADE_STEP: Duration = Duration::from_millis(25);
pub const FADE_IN: Duration = Duration::from_millis(250);
pub const FADE_OUT: Duration = Duration::from_millis(500);
pub const PLAY_VOLUME: f32 = 0.9;

/// Ambient music around a spin.
#[allow(async_fn_in_trait)]
pub trait Audio {
    async fn start(&mut self);
    async fn stop(&mut self);
}

/// Playback backend driven by [`Music`].
pub trait Output {
    fn set_source(&mut self, source: Option<PathBuf>);
    fn has_source(&self) -> bool;
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    /// Begin (or resume) looping playback of the source.
    fn play(&mut self) -> io::Result<()>;
    fn pause_and_rewind(&mut self);
}

/// Backend for builds without a sound device. Never has a source.
#[derive(Debug, Default)]
pub struct NullOutput;

impl Output for NullOutput {
    fn set_source(&mut self, source: Option<PathBuf>) {
        if source.is_some() {
            warn!("audio support not compiled in; music is disabled");
        }
    }

    fn has_source(&self) -> bool {
        false
    }

    fn volume(&self) -> f32 {
        0.0
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn play(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn pause_and_rewind(&mut self) {}
}

pub fn fade_steps(duration: Duration) -> u32 {
    ((duration.as_millis() / FADE_STEP.as_millis()) as u32).max(1)
}

/// Linear volume ramp in [`FADE_STEP`] increments.
pub async fn fade_volume<O: Output>(output: &mut O, target: f32, duration: Duration) {
    let steps = fade_steps(duration);
    let start = output.volume();
    let delta = (target - start) / steps as f32;
    let mut ticker = time::interval_at(Instant::now() + FADE_STEP, FADE_STEP);
    for i in 1..=steps {
        ticker.tick().await;
        let volume = if i == steps { target } else { start + delta * i as f32 };
        output.set_volume(clamp01(volume as f64) as f32);
    }
}

#[derive(Debug, Default)]
pub struct Music<O> {
    output: O,
}

impl<O: Output> Music<O> {
    pub fn new(output: O) -> Self {
        Music { output }
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Empty `source` removes the music.
    pub fn set_source(&mut self, source: &str) {
        let source = source.trim();
        self.output.pause_and_rewind();
        if source.is_empty() {
            self.output.set_source(None);
        } else {
            let expanded = shellexpand::tilde(source).into_owned();
            self.output.set_source(Some(PathBuf::from(expanded)));
            self.output.set_volume(0.0);
        }
    }

    /// Stop immediately, without fading.
    pub fn halt(&mut self) {
        if self.output.has_source() {
            self.output.pause_and_rewind();
            self.output.set_volume(0.0);
        }
    }
}

impl<O: Output> Audio for Music<O> {
    async fn start(&mut self) {
        if !self.output.has_source() {
            return;
        }
        if let Err(err) = self.output.play() {
            warn!(?err, "music playback failed");
            return;
        }
        debug!("music fade in");
        fade_volume(&mut self.output, PLAY_VOLUME, FADE_IN).await;
    }

    async fn stop(&mut self) {
        if !self.output.has_source() {
            return;
        }
        debug!("music fade out");
        fade_volume(&mut self.output, 0.0, FADE_OUT).await;
        self.output.pause_and_rewind();
    }
}

#[cfg(feature = "rodio")]
pub use self::rodio_output::RodioOutput;

#[cfg(feature = "rodio")]
mod rodio_output {
    use super::Output;
    use rodio::{
        Decoder,
        OutputStream,
        OutputStreamHandle,
        Sink,
        Source,
    };
    use std::{
        fs::File,
        io::{
            self,
            BufReader,
        },
        path::PathBuf,
    };

    /// Plays a local audio file on the default output device.
    pub struct RodioOutput {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sink: Option<Sink>,
        source: Option<PathBuf>,
        volume: f32,
    }

    impl RodioOutput {
        pub fn new() -> io::Result<Self> {
            let (stream, handle) = OutputStream::try_default().map_err(io::Error::other)?;
            Ok(RodioOutput {
                _stream: stream,
                handle,
                sink: None,
                source: None,
                volume: 0.0,
            })
        }
    }

    impl Output for RodioOutput {
        fn set_source(&mut self, source: Option<PathBuf>) {
            self.pause_and_rewind();
            self.source = source;
        }

        fn has_source(&self) -> bool {
            self.source.is_some()
        }

        fn volume(&self) -> f32 {
            self.volume
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
            if let Some(sink) = &self.sink {
                sink.set_volume(volume);
            }
        }

        fn play(&mut self) -> io::Result<()> {
            let Some(path) = &self.source else {
                return Ok(());
            };
            if self.sink.is_none() {
                let file = BufReader::new(File::open(path)?);
                let decoder = Decoder::new(file).map_err(io::Error::other)?;
                let sink = Sink::try_new(&self.handle).map_err(io::Error::other)?;
                sink.set_volume(self.volume);
                sink.append(decoder.repeat_infinite());
                self.sink = Some(sink);
            }
            if let Some(sink) = &self.sink {
                sink.play();
            }
            Ok(())
        }

        fn pause_and_rewind(&mut self) {
            // dropping the queue rewinds: the next play reopens the file
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
        }
    }
}
