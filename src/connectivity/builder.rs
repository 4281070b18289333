//! Concurrent streamline to connectivity pipeline.
//!
//! A loader thread reads streamlines in batches, a pool of mapper threads
//! turns them into dixels, and the calling thread assigns dixels to fixels
//! and accumulates the counts. Stages are connected by bounded channels, so
//! a fast stage blocks once it gets too far ahead of the next one.

use super::RawConnectivity;
use crate::config::{CfeConfig, RECOMMENDED_TRACK_COUNT};
use crate::error::{FixelError, Result};
use crate::index::FixelIndex;
use crate::mapping::{Dixel, TrackMapper};
use crate::tracks::{Streamline, TrackSource};
use crate::util::closest_direction;
use crossbeam_channel::bounded;
use log::{debug, info, warn};
use std::mem;
use std::thread;

/// Number of streamlines sent through the pipeline at once.
const BATCH_SIZE: usize = 256;
/// Capacity, in batches, of each inter-stage queue.
const QUEUE_CAPACITY: usize = 16;

/// Assigns dixels to template fixels and accumulates streamline connectivity.
#[derive(Debug)]
pub struct TrackProcessor<'a> {
    index: &'a FixelIndex,
    threshold_dp: f32,
    raw: RawConnectivity,
    dropped: usize,
}

impl<'a> TrackProcessor<'a> {
    /// Create a processor accumulating over the fixels of `index`.
    pub fn new(index: &'a FixelIndex, threshold_dp: f32) -> Self {
        TrackProcessor {
            index,
            threshold_dp,
            raw: RawConnectivity::new(index.num_fixels()),
            dropped: 0,
        }
    }

    /// The fixel a dixel corresponds to, if any lies within the angular threshold.
    pub fn assign(&self, dixel: &Dixel) -> Option<usize> {
        let range = self.index.fixels_in(dixel.voxel)?;
        let start = range.start;
        let candidates = &self.index.directions()[range];
        closest_direction(&dixel.dir, candidates, self.threshold_dp).map(|i| start + i)
    }

    /// Accumulate the dixels of one streamline.
    pub fn process(&mut self, dixels: &[Dixel]) {
        let mut visited = Vec::with_capacity(dixels.len());
        for d in dixels {
            match self.assign(d) {
                Some(f) => visited.push(f),
                None => self.dropped += 1,
            }
        }
        self.raw.add_streamline(&visited);
    }

    /// Number of dixels that did not correspond to any fixel.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Finish accumulating and hand over the counts.
    pub fn into_connectivity(self) -> RawConnectivity {
        self.raw
    }
}

/// Stream every streamline of `source` through the mapper and accumulate the
/// fixel-fixel co-visitation counts.
///
/// # Errors
///
/// - `FixelError::NoTracks` if the source declares no streamlines.
/// - Any error raised while reading the source, which aborts the pipeline.
pub fn build_connectivity<S>(
    mut source: S,
    mapper: &TrackMapper,
    index: &FixelIndex,
    config: &CfeConfig,
) -> Result<RawConnectivity>
where
    S: TrackSource + Send,
{
    let declared = source.declared_count();
    if declared == 0 {
        return Err(FixelError::NoTracks);
    }
    if declared < RECOMMENDED_TRACK_COUNT {
        warn!("more than 1 million tracks should be used to ensure robust fixel-fixel connectivity");
    }
    info!("pre-computing fixel-fixel connectivity from {} tracks...", declared);

    let num_mappers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let (track_tx, track_rx) = bounded::<Vec<Streamline>>(QUEUE_CAPACITY);
    let (dixel_tx, dixel_rx) = bounded::<Vec<Vec<Dixel>>>(QUEUE_CAPACITY);
    let mut processor = TrackProcessor::new(index, config.angular_threshold_dp());

    let loaded = thread::scope(|s| -> Result<usize> {
        let loader = s.spawn(move || -> Result<usize> {
            let mut loaded = 0;
            let mut batch = Vec::with_capacity(BATCH_SIZE);
            while let Some(track) = source.next_streamline()? {
                loaded += 1;
                batch.push(track);
                if batch.len() == BATCH_SIZE {
                    let full = mem::replace(&mut batch, Vec::with_capacity(BATCH_SIZE));
                    if track_tx.send(full).is_err() {
                        return Err(FixelError::PipelineFailure("mapper"));
                    }
                }
            }
            if !batch.is_empty() && track_tx.send(batch).is_err() {
                return Err(FixelError::PipelineFailure("mapper"));
            }
            Ok(loaded)
        });

        let mappers: Vec<_> = (0..num_mappers)
            .map(|_| {
                let track_rx = track_rx.clone();
                let dixel_tx = dixel_tx.clone();
                s.spawn(move || {
                    for batch in track_rx {
                        let mapped: Vec<_> = batch.iter().map(|t| mapper.map(t)).collect();
                        if dixel_tx.send(mapped).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(track_rx);
        drop(dixel_tx);

        for batch in dixel_rx {
            for dixels in &batch {
                processor.process(dixels);
            }
        }

        let mut mapper_failed = false;
        for m in mappers {
            mapper_failed |= m.join().is_err();
        }
        let loaded = loader
            .join()
            .map_err(|_| FixelError::PipelineFailure("loader"))??;
        if mapper_failed {
            return Err(FixelError::PipelineFailure("mapper"));
        }
        Ok(loaded)
    })?;

    if loaded != declared {
        warn!("track file declares {} tracks but {} were read", declared, loaded);
    }
    debug!("{} streamline samples matched no fixel", processor.dropped());
    let raw = processor.into_connectivity();
    info!("{} tracks processed, {} fixel-fixel entries", loaded, raw.num_entries());
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{FixelImage, FixelMetric};
    use crate::tracks::VecTrackSource;
    use nalgebra::Vector3;

    fn single_voxel_index() -> FixelIndex {
        let mut img = FixelImage::with_spacing([1, 1, 1], [2.0; 3]);
        for d in &[Vector3::x(), Vector3::y(), Vector3::z()] {
            img.push_fixel([0, 0, 0], FixelMetric::new(*d, 1.0)).unwrap();
        }
        FixelIndex::new(&img).unwrap()
    }

    #[test]
    fn nearly_x_tangent_matches_first_fixel() {
        let index = single_voxel_index();
        let p = TrackProcessor::new(&index, CfeConfig::default().angular_threshold_dp());
        let dir = Vector3::new(0.99, 0.01, 0.0).normalize();
        let d = Dixel { voxel: [0, 0, 0], dir };
        assert_eq!(p.assign(&d), Some(0));
        assert_eq!(p.assign(&Dixel { voxel: [0, 0, 0], dir: -dir }), Some(0));
    }

    #[test]
    fn unmatched_dixels_are_dropped() {
        let index = single_voxel_index();
        let mut p = TrackProcessor::new(&index, CfeConfig::default().angular_threshold_dp());
        let oblique = Vector3::new(1.0, 1.0, 1.0).normalize();
        p.process(&[
            Dixel { voxel: [0, 0, 0], dir: oblique },
            Dixel { voxel: [3, 0, 0], dir: Vector3::x() },
        ]);
        assert_eq!(p.dropped(), 2);
        assert_eq!(p.into_connectivity().tdi(), &[0, 0, 0]);
    }

    #[test]
    fn zero_declared_tracks_is_fatal() {
        let index = single_voxel_index();
        let affine = crate::affine::shape_zoom_affine(&[1, 1, 1], &[2.0; 3]);
        let mapper = TrackMapper::new([1, 1, 1], [2.0; 3], &affine).unwrap();
        let source = VecTrackSource::new(vec![]);
        match build_connectivity(source, &mapper, &index, &CfeConfig::default()) {
            Err(FixelError::NoTracks) => {}
            e => panic!("unexpected result {:?}", e),
        }
    }

    /// Yields copies of one streamline, then fails.
    struct FailingSource {
        track: Streamline,
        remaining: usize,
    }

    impl TrackSource for FailingSource {
        fn declared_count(&self) -> usize {
            2 * self.remaining
        }

        fn next_streamline(&mut self) -> Result<Option<Streamline>> {
            if self.remaining == 0 {
                return Err(FixelError::InvalidTrackFile("truncated data".to_string()));
            }
            self.remaining -= 1;
            Ok(Some(self.track.clone()))
        }
    }

    fn row_image() -> FixelImage {
        // a row of voxels along x, each with an x fixel and a y fixel
        let mut img = FixelImage::with_spacing([4, 1, 1], [2.0; 3]);
        for x in 0..4 {
            img.push_fixel([x, 0, 0], FixelMetric::new(Vector3::x(), 1.0)).unwrap();
            img.push_fixel([x, 0, 0], FixelMetric::new(Vector3::y(), 1.0)).unwrap();
        }
        img
    }

    #[test]
    fn pipeline_accumulates_every_streamline() {
        let img = row_image();
        let index = FixelIndex::new(&img).unwrap();
        let mapper = TrackMapper::new(img.dim(), img.pixdim(), img.affine()).unwrap();
        let start = img.voxel_to_scanner([0, 0, 0]);
        let end = img.voxel_to_scanner([3, 0, 0]);

        let n = 1000;
        let tracks: Vec<_> = (0..n).map(|_| vec![start, end]).collect();
        let raw = build_connectivity(VecTrackSource::new(tracks), &mapper, &index, &CfeConfig::default()).unwrap();

        // x fixels are at even indices
        assert_eq!(raw.tdi(), &[n, 0, n, 0, n, 0, n, 0]);
        assert_eq!(raw.count(0, 6), n);
        assert_eq!(raw.count(6, 0), n);
        assert_eq!(raw.count(1, 3), 0);
        assert_eq!(raw.row(2).len(), 3);
    }

    #[test]
    fn read_error_aborts_pipeline() {
        let img = row_image();
        let index = FixelIndex::new(&img).unwrap();
        let mapper = TrackMapper::new(img.dim(), img.pixdim(), img.affine()).unwrap();
        let source = FailingSource {
            track: vec![img.voxel_to_scanner([0, 0, 0]), img.voxel_to_scanner([3, 0, 0])],
            remaining: 1000,
        };
        match build_connectivity(source, &mapper, &index, &CfeConfig::default()) {
            Err(FixelError::InvalidTrackFile(reason)) => assert_eq!(reason, "truncated data"),
            e => panic!("unexpected result {:?}", e),
        }
    }
}
