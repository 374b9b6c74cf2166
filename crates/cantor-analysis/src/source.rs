//! Full source analysis of a sentence's pieces.

use cantor_core::{Device, Piece, RaggedArray, RenderConfig};

use crate::periods::{extract_all, PeriodTable, SourcePeriod};
use crate::spectral::{analyze_spectra, PeriodSpectra, SpectralLayout};
use crate::voicing::{propagate_on_host, search_extents};
use crate::Result;

/// Device-resident analysis of every piece, ready for synthesis.
#[derive(Debug)]
pub struct SourceAnalysis {
    /// Host copy of the period lists (timeline building reads these)
    pub table: PeriodTable,
    pub periods: RaggedArray<SourcePeriod>,
    pub extents: RaggedArray<u32>,
    pub spectra: PeriodSpectra,
}

impl SourceAnalysis {
    /// Period record of `(piece, period)`.
    #[inline]
    pub fn period(&self, piece: usize, period: usize) -> &SourcePeriod {
        &self.periods.item(piece)[period]
    }
}

/// Extract periods, search and propagate voiced extents, then decompose
/// every period.
///
/// Extent propagation runs on the host between the two device stages; its
/// results are written back before decomposition starts.
pub fn analyze_sources(
    device: &Device,
    pieces: &[Piece],
    config: &RenderConfig,
) -> Result<SourceAnalysis> {
    let table = extract_all(pieces, config)?;
    tracing::debug!(
        "Extracted {} periods ({} analyzed) from {} pieces",
        table.total_periods(),
        table.analyzed.len(),
        pieces.len()
    );

    let waves: Vec<Vec<f32>> = pieces.iter().map(|p| p.wave.clone()).collect();
    let waves = device.upload_ragged(&waves);
    let periods = device.upload_ragged(&table.pieces);

    let mut extents = search_extents(
        device,
        &waves,
        &periods,
        &table.analyzed,
        config.threshold(),
    );
    propagate_on_host(device, &table, &mut extents)?;

    let layout = SpectralLayout::from_max_half_window(table.max_half_window);
    let spectra = analyze_spectra(device, &waves, &periods, &extents, layout);

    Ok(SourceAnalysis {
        table,
        periods,
        extents,
        spectra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cantor_core::{AlignmentPoint, PitchTrack, VoicingClass};

    fn sine_piece(freq: f32, voicing: VoicingClass) -> Piece {
        let wave = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin())
            .collect();
        Piece {
            wave,
            pitch: PitchTrack::constant(freq, 256, 4410),
            alignment: vec![
                AlignmentPoint::new(0.0, 0.0, voicing),
                AlignmentPoint::new(100.0, 100.0, voicing),
            ],
        }
    }

    #[test]
    fn test_analyze_two_pieces() {
        let device = Device::sequential();
        let config = RenderConfig::default();
        let pieces = [
            sine_piece(220.0, VoicingClass::Voiced),
            sine_piece(330.0, VoicingClass::Unvoiced),
        ];
        let analysis = analyze_sources(&device, &pieces, &config).unwrap();

        assert_eq!(analysis.periods.len(), 2);
        assert_eq!(analysis.spectra.layout.half_window, 201);
        // Unvoiced piece never gets an extent
        assert!(analysis.extents.item(1).iter().all(|&e| e == 0));
        assert!(analysis.extents.item(0).iter().any(|&e| e > 0));
        assert_eq!(analysis.period(0, 1).voicing, VoicingClass::Voiced);
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let pieces = [sine_piece(220.0, VoicingClass::Voiced)];
        let config = RenderConfig::default();
        let seq = analyze_sources(&Device::sequential(), &pieces, &config).unwrap();
        let par = analyze_sources(&Device::from_config(&config).unwrap(), &pieces, &config).unwrap();

        assert_eq!(seq.extents.flat(), par.extents.flat());
        assert_eq!(seq.spectra.harmonics.flat(), par.spectra.harmonics.flat());
        assert_eq!(seq.spectra.noise.flat(), par.spectra.noise.flat());
    }
}
