use std::io::Cursor;
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, FromSample, SampleFormat, SizedSample, StreamConfig};

use crate::{MetronomeError, Result};

/// Wood block click compiled into the binary.
pub const WOOD_BLOCK_WAV: &[u8] = include_bytes!("../../assets/wood-block.wav");

/// Extra time granted to the output device before a click counts as lost.
const PLAYBACK_GRACE: Duration = Duration::from_secs(2);

/// Decoded mono click, shared between the player and the audio callback.
#[derive(Debug, Clone)]
pub struct ClickSample {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl ClickSample {
    /// Decodes the embedded wood block click.
    pub fn wood_block() -> Result<Self> {
        Self::decode(WOOD_BLOCK_WAV)
    }

    /// Decodes a WAV image, mixing every channel down to mono.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let mono: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        if mono.is_empty() {
            return Err(MetronomeError::msg("click sample contains no audio"));
        }

        Ok(Self {
            samples: mono.into(),
            sample_rate: spec.sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.len() as f64 / f64::from(self.sample_rate.max(1)))
    }
}

/// Something that can sound one click at a time.
pub trait ClickPlayer {
    /// Plays the click from the current position and blocks until it ends.
    fn play(&mut self) -> Result<()>;

    /// Moves the read position back to the first sample.
    fn rewind(&mut self) -> Result<()>;
}

/// Read cursor into the click, advanced by the audio callback.
#[derive(Debug, Default)]
struct Playback {
    position: f64,
    active: bool,
    done: Option<mpsc::Sender<()>>,
}

impl Playback {
    fn next_sample(&mut self, samples: &[f32], step: f64) -> f32 {
        if !self.active {
            return 0.0;
        }
        let index = self.position as usize;
        match samples.get(index) {
            Some(&value) => {
                self.position += step;
                value
            }
            None => {
                self.active = false;
                if let Some(done) = self.done.take() {
                    let _ = done.send(());
                }
                0.0
            }
        }
    }
}

/// [`ClickPlayer`] backed by the default `cpal` output device.
///
/// `cpal::Stream` is not `Send` on every host, so a speaker must be created on
/// the thread that plays through it.
pub struct Speaker {
    _stream: cpal::Stream,
    playback: Arc<Mutex<Playback>>,
    click_duration: Duration,
}

impl Speaker {
    /// Opens the default output device with a buffer of
    /// `sample_rate / buffer_divisor` frames.
    pub fn open(click: ClickSample, buffer_divisor: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| MetronomeError::AudioInit("no output device available".into()))?;
        let supported = device.default_output_config().map_err(audio_init)?;
        let sample_format = supported.sample_format();

        let mut config: StreamConfig = supported.into();
        config.buffer_size = BufferSize::Fixed(config.sample_rate.0 / buffer_divisor.max(1));

        let playback = Arc::new(Mutex::new(Playback::default()));
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, &click, &playback),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, &click, &playback),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, &click, &playback),
            other => Err(MetronomeError::AudioInit(format!(
                "unsupported sample format: {other}"
            ))),
        }?;
        stream.play().map_err(audio_init)?;

        tracing::info!(
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            ?sample_format,
            "audio output ready"
        );

        Ok(Self {
            _stream: stream,
            playback,
            click_duration: click.duration(),
        })
    }

    fn lock_playback(&self) -> std::result::Result<MutexGuard<'_, Playback>, String> {
        self.playback
            .lock()
            .map_err(|_| "playback state has been poisoned".to_string())
    }
}

impl ClickPlayer for Speaker {
    fn play(&mut self) -> Result<()> {
        let (done_tx, done_rx) = mpsc::channel();
        {
            let mut playback = self.lock_playback().map_err(MetronomeError::Playback)?;
            playback.active = true;
            playback.done = Some(done_tx);
        }

        done_rx
            .recv_timeout(self.click_duration + PLAYBACK_GRACE)
            .map_err(|err| MetronomeError::Playback(err.to_string()))
    }

    fn rewind(&mut self) -> Result<()> {
        let mut playback = self.lock_playback().map_err(MetronomeError::Rewind)?;
        playback.position = 0.0;
        Ok(())
    }
}

impl std::fmt::Debug for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Speaker")
            .field("click_duration", &self.click_duration)
            .finish()
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    click: &ClickSample,
    playback: &Arc<Mutex<Playback>>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = usize::from(config.channels.max(1));
    let step = f64::from(click.sample_rate) / f64::from(config.sample_rate.0.max(1));
    let samples = click.samples.clone();
    let playback = playback.clone();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let Ok(mut playback) = playback.lock() else {
                    data.fill(T::EQUILIBRIUM);
                    return;
                };
                for frame in data.chunks_mut(channels) {
                    let value = playback.next_sample(&samples, step);
                    frame.fill(T::from_sample(value));
                }
            },
            |err| tracing::error!(%err, "audio stream error"),
            None,
        )
        .map_err(audio_init)
}

fn audio_init(err: impl std::fmt::Display) -> MetronomeError {
    MetronomeError::AudioInit(err.to_string())
}
