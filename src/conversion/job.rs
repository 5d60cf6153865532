//! Conversion job: setup, streaming, cleanup and completion reporting

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::audio::{
    AudioFile, AudioFileIo, BuiltinFormatInfo, ContainerType, Converter, CreateFlags, FormatId,
    FormatInfoResolver, ResumeCapability,
};
use crate::conversion::{
    BufferPool, ConversionLoop, ErrorClassifier, FormatNegotiator, InterruptionCenter,
    InterruptionController, LoopReport, Registration, SessionActivator, DEFAULT_BUFFER_BYTE_SIZE,
};
use crate::error::{ConvertError, Result};

/// Receives the single outcome of a job.
pub trait ConversionObserver: Send + Sync {
    fn on_error(&self, job: &ConversionJob, error: &ConvertError);

    fn on_complete(&self, job: &ConversionJob, destination: &Path);
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutcome {
    Success(PathBuf),
    Failure(ConvertError),
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&ConvertError> {
        match self {
            ConversionOutcome::Failure(e) => Some(e),
            ConversionOutcome::Success(_) => None,
        }
    }

    pub fn into_result(self) -> Result<PathBuf> {
        match self {
            ConversionOutcome::Success(path) => Ok(path),
            ConversionOutcome::Failure(e) => Err(e),
        }
    }
}

/// What to convert and into what.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// 0.0 keeps the source rate.
    pub sample_rate: f64,
    pub output_format: FormatId,
    pub container: ContainerType,
    pub buffer_byte_size: usize,
}

impl ConversionRequest {
    pub fn new<S: Into<PathBuf>, D: Into<PathBuf>>(source: S, destination: D) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            sample_rate: 0.0,
            output_format: FormatId::LinearPcm,
            container: ContainerType::Wav,
            buffer_byte_size: DEFAULT_BUFFER_BYTE_SIZE,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_output_format(mut self, output_format: FormatId) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn with_container(mut self, container: ContainerType) -> Self {
        self.container = container;
        self
    }

    pub fn with_buffer_byte_size(mut self, buffer_byte_size: usize) -> Self {
        self.buffer_byte_size = buffer_byte_size;
        self
    }
}

/// Handles owned by a running job, released destination first, then source,
/// then converter.
#[derive(Default)]
struct JobHandles {
    source: Option<Box<dyn AudioFile>>,
    destination: Option<Box<dyn AudioFile>>,
    converter: Option<Box<dyn Converter>>,
}

impl JobHandles {
    fn release(&mut self) {
        if let Some(destination) = self.destination.take() {
            destination.dispose();
        }
        if let Some(source) = self.source.take() {
            source.dispose();
        }
        if let Some(converter) = self.converter.take() {
            converter.dispose();
        }
    }
}

impl Drop for JobHandles {
    fn drop(&mut self) {
        self.release();
    }
}

/// Attaches a step description to a setup failure.
fn setup_step(step: &str) -> impl FnOnce(ConvertError) -> ConvertError + '_ {
    move |e| match e {
        ConvertError::FormatResolution { .. } => e,
        other => match other.status() {
            Some(code) => ConvertError::setup_with_code(format!("{}: {}", step, other), code),
            None => ConvertError::setup(format!("{}: {}", step, other)),
        },
    }
}

/// One conversion from a source file to a destination file.
///
/// A job runs once. It subscribes to its [`InterruptionCenter`] when built
/// and stays subscribed until [`ConversionJob::dispose`] (or drop).
pub struct ConversionJob {
    request: ConversionRequest,
    io: Arc<dyn AudioFileIo>,
    resolver: Arc<dyn FormatInfoResolver>,
    controller: Arc<InterruptionController>,
    observer: Option<Weak<dyn ConversionObserver>>,
    registration: Mutex<Option<Registration>>,
    report: Mutex<Option<LoopReport>>,
}

impl ConversionJob {
    pub fn builder(request: ConversionRequest, io: Arc<dyn AudioFileIo>) -> ConversionJobBuilder {
        ConversionJobBuilder {
            request,
            io,
            resolver: None,
            activator: None,
            center: None,
            observer: None,
        }
    }

    pub fn request(&self) -> &ConversionRequest {
        &self.request
    }

    pub fn source(&self) -> &Path {
        &self.request.source
    }

    pub fn destination(&self) -> &Path {
        &self.request.destination
    }

    pub fn controller(&self) -> &Arc<InterruptionController> {
        &self.controller
    }

    /// Counters of a successful run.
    pub fn report(&self) -> Option<LoopReport> {
        self.report.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Runs the job on a new background thread.
    pub fn start(self: Arc<Self>) -> Result<JoinHandle<ConversionOutcome>> {
        let name = format!(
            "convert-{}",
            self.request.source.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        );
        thread::Builder::new()
            .name(name)
            .spawn(move || self.run())
            .map_err(|e| ConvertError::io(format!("Failed to spawn conversion worker: {}", e)))
    }

    /// Runs the job on the calling thread, which must not be the UI thread.
    pub fn run(&self) -> ConversionOutcome {
        if !self.controller.mark_running() {
            warn!("Conversion job for {} already ran", self.request.source.display());
            return ConversionOutcome::Failure(ConvertError::setup("Conversion job already ran"));
        }

        let start = Instant::now();
        let result = {
            let mut handles = JobHandles::default();
            let result = self.convert(&mut handles);
            handles.release();
            result
        };
        self.controller.mark_done();

        match result {
            Ok(report) => {
                info!(
                    "Converted {} frames in {} cycles ({} interruptions, {} resubmits) in {:.2}s",
                    report.frames_written,
                    report.cycles,
                    report.interruptions,
                    report.resubmits,
                    start.elapsed().as_secs_f64()
                );
                *self.report.lock().unwrap_or_else(PoisonError::into_inner) = Some(report);
                self.notify(|observer| observer.on_complete(self, &self.request.destination));
                ConversionOutcome::Success(self.request.destination.clone())
            }
            Err(e) => {
                error!("Conversion of {} failed: {}", self.request.source.display(), e);
                self.notify(|observer| observer.on_error(self, &e));
                ConversionOutcome::Failure(e)
            }
        }
    }

    /// Releases the interruption subscription.
    pub fn dispose(&self) {
        let registration = self.registration.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(registration) = registration {
            registration.release();
        }
    }

    fn notify<F>(&self, callback: F)
    where
        F: FnOnce(&dyn ConversionObserver),
    {
        match self.observer.as_ref().and_then(Weak::upgrade) {
            Some(observer) => callback(observer.as_ref()),
            None => debug!("No observer to notify"),
        }
    }

    fn convert(&self, handles: &mut JobHandles) -> Result<LoopReport> {
        let request = &self.request;

        let source = handles.source.insert(
            self.io
                .open(&request.source)
                .map_err(setup_step(&format!("Failed to open source file {}", request.source.display())))?,
        );
        let source_format = source
            .file_format()
            .map_err(setup_step("Couldn't get the source data format"))?;

        let formats = FormatNegotiator::new(Arc::clone(&self.resolver))
            .negotiate(&source_format, request.sample_rate, request.output_format)
            .map_err(setup_step("Couldn't fill out the destination data format"))?;

        info!("Source file format:\n{}", source_format);
        info!("Destination file format:\n{}", formats.destination);

        let destination = handles.destination.insert(
            self.io
                .create(&request.destination, request.container, &formats.destination, CreateFlags { erase_file: true })
                .map_err(setup_step(&format!("Failed to create {}", request.destination.display())))?,
        );

        info!("Client file format:\n{}", formats.client);
        source
            .set_client_format(&formats.client)
            .map_err(setup_step("Couldn't set the client format on the source file"))?;
        destination
            .set_client_format(&formats.client)
            .map_err(setup_step("Couldn't set the client format on the destination file"))?;

        handles.converter = destination
            .take_converter()
            .map_err(setup_step("Failed to get the audio converter from the destination file"))?;

        let can_resume = match handles.converter.as_ref() {
            None => {
                debug!("No audio converter involved, conversion can always resume");
                true
            }
            Some(converter) => {
                let capability = converter
                    .can_resume()
                    .map_err(setup_step("Couldn't query whether the audio converter can resume"))?;
                if capability == ResumeCapability::Unsupported {
                    info!("Resume-from-interruption query not supported, treating the converter as resumable");
                }
                capability.is_resumable()
            }
        };
        info!("Audio converter {} continue after interruption", if can_resume { "CAN" } else { "CANNOT" });

        if formats.client.bytes_per_frame == 0 {
            return Err(ConvertError::setup("Client format has no fixed frame size"));
        }
        if request.buffer_byte_size < formats.client.bytes_per_frame as usize {
            return Err(ConvertError::setup(format!(
                "Buffer of {} bytes cannot hold one {}-byte frame",
                request.buffer_byte_size, formats.client.bytes_per_frame
            )));
        }

        let mut buffer = BufferPool::new(request.buffer_byte_size);
        info!("Converting...");
        ConversionLoop::new(
            &mut **source,
            &mut **destination,
            &mut buffer,
            &self.controller,
            ErrorClassifier::new(can_resume),
            formats.client.bytes_per_frame,
        )
        .run()
    }
}

impl fmt::Debug for ConversionJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionJob")
            .field("request", &self.request)
            .field("state", &self.controller.state())
            .finish()
    }
}

pub struct ConversionJobBuilder {
    request: ConversionRequest,
    io: Arc<dyn AudioFileIo>,
    resolver: Option<Arc<dyn FormatInfoResolver>>,
    activator: Option<Arc<dyn SessionActivator>>,
    center: Option<InterruptionCenter>,
    observer: Option<Weak<dyn ConversionObserver>>,
}

impl ConversionJobBuilder {
    pub fn resolver(mut self, resolver: Arc<dyn FormatInfoResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn activator(mut self, activator: Arc<dyn SessionActivator>) -> Self {
        self.activator = Some(activator);
        self
    }

    /// Interruption source to subscribe to. Defaults to [`InterruptionCenter::global`].
    pub fn center(mut self, center: &InterruptionCenter) -> Self {
        self.center = Some(center.clone());
        self
    }

    /// The job only keeps a weak reference; the caller keeps the observer alive.
    pub fn observer<O>(mut self, observer: &Arc<O>) -> Self
    where
        O: ConversionObserver + 'static,
    {
        let observer: Arc<dyn ConversionObserver> = observer.clone();
        self.observer = Some(Arc::downgrade(&observer));
        self
    }

    pub fn build(self) -> Result<Arc<ConversionJob>> {
        if self.request.buffer_byte_size == 0 {
            return Err(ConvertError::config("Buffer size must be greater than 0"));
        }
        if !(self.request.sample_rate >= 0.0) || !self.request.sample_rate.is_finite() {
            return Err(ConvertError::config(format!("Invalid sample rate: {}", self.request.sample_rate)));
        }

        let controller = Arc::new(InterruptionController::with_activator(self.activator));
        let center = self.center.unwrap_or_else(|| InterruptionCenter::global().clone());
        let registration = center.subscribe(&controller);

        Ok(Arc::new(ConversionJob {
            request: self.request,
            io: self.io,
            resolver: self.resolver.unwrap_or_else(|| Arc::new(BuiltinFormatInfo)),
            controller,
            observer: self.observer,
            registration: Mutex::new(Some(registration)),
            report: Mutex::new(None),
        }))
    }
}
