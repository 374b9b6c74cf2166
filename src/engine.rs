//! SentenceEngine that runs the resynthesis stages in order

use cantor_analysis::analyze_sources;
use cantor_core::{rng, Device, RenderConfig, SentenceDescriptor, TransferStats};
use cantor_sampler::{
    build_segments, mix, plan_jobs, synthesize, ControlPointMapper, FrequencyMap, FrequencyMapper,
};

use crate::Result;

/// Whole-utterance resynthesis engine.
///
/// One engine owns a validated [`RenderConfig`] and the execution backend;
/// each `render*` call is an independent batch run over a
/// [`SentenceDescriptor`]. Identical descriptors, configs and seeds give
/// bit-identical output on either backend.
///
/// # Example
///
/// ```ignore
/// use cantor::prelude::*;
///
/// let engine = SentenceEngine::builder().seed(1).build()?;
/// let mut out = vec![0.0; 44100];
/// engine.render(&descriptor, &mut out)?;
/// ```
#[derive(Debug)]
pub struct SentenceEngine {
    config: RenderConfig,
    device: Device,
}

impl SentenceEngine {
    /// Create a new engine builder
    pub fn builder() -> crate::SentenceEngineBuilder {
        crate::SentenceEngineBuilder::default()
    }

    pub(crate) fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        let device = Device::from_config(&config)?;
        Ok(Self { config, device })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Bytes moved between host and device since the engine was built.
    pub fn transfer_stats(&self) -> TransferStats {
        self.device.transfer_stats()
    }

    /// Render `desc` into `out`; the output length is `out.len()`.
    ///
    /// Target pitch and segment boundaries come from the descriptor's
    /// `freq_map` and `piece_map`.
    pub fn render(&self, desc: &SentenceDescriptor, out: &mut [f32]) -> Result<()> {
        desc.validate()?;
        let map = ControlPointMapper.map(desc, out.len(), self.config.sample_rate)?;
        self.render_with_map(desc, &map, out)
    }

    /// Render `len` samples into a new buffer.
    pub fn render_to_vec(&self, desc: &SentenceDescriptor, len: usize) -> Result<Vec<f32>> {
        let mut out = vec![0.0; len];
        self.render(desc, &mut out)?;
        Ok(out)
    }

    /// Render with a caller-supplied frequency map, bypassing the descriptor's
    /// `freq_map`.
    pub fn render_with_map(
        &self,
        desc: &SentenceDescriptor,
        map: &FrequencyMap,
        out: &mut [f32],
    ) -> Result<()> {
        desc.validate()?;
        map.validate(out.len())?;
        let rate = self.config.sample_rate;
        let before = self.device.transfer_stats();

        let analysis = analyze_sources(&self.device, &desc.pieces, &self.config)?;

        let segments = build_segments(map);
        let plan = plan_jobs(
            &segments,
            map,
            &analysis.table.pieces,
            &desc.piece_map,
            rate,
        );
        tracing::debug!(
            "Time warp: {} segments, {} jobs, {} random phases",
            segments.len(),
            plan.jobs.len(),
            plan.random_phase_len
        );

        let phases = self
            .device
            .upload(&rng::random_phases(self.config.seed, plan.random_phase_len));
        let template = synthesize(&self.device, &segments, &plan, &analysis, &phases)?;
        let template = self.device.download(&template);

        mix(&template, &segments, map, &desc.volume_map, rate, out);

        let after = self.device.transfer_stats();
        tracing::debug!(
            "Rendered {} samples: uploaded {} bytes, downloaded {} bytes",
            out.len(),
            after.uploaded_bytes - before.uploaded_bytes,
            after.downloaded_bytes - before.downloaded_bytes
        );
        Ok(())
    }
}
