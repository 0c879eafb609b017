use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use vzip_core::{CodecKind, FramePipeline, FrameSource, MemorySource, PipelineConfig};

const FRAME_COUNT: usize = 64;
const FRAME_SIZE: usize = 256 * 1024;

fn synthetic_frames() -> MemorySource {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    let frames = (0..FRAME_COUNT)
        .map(|frame| {
            (0..FRAME_SIZE)
                .map(|offset| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    // Smooth gradient with sparse noise, roughly like a rendered frame.
                    let noise = if offset % 32 == 0 { state as u8 & 0x0f } else { 0 };
                    ((offset % 768) as u8 / 3).wrapping_add(frame as u8).wrapping_add(noise)
                })
                .collect::<Vec<u8>>()
        })
        .collect();
    MemorySource::from_vecs(frames)
}

fn bench_pool_sizes(c: &mut Criterion) {
    let source: Arc<dyn FrameSource> = Arc::new(synthetic_frames());
    let total_bytes = (FRAME_COUNT * FRAME_SIZE) as u64;

    for codec in [CodecKind::Zlib { level: 6 }, CodecKind::Lz4] {
        let mut group = c.benchmark_group(format!("pipeline/{}", codec.name()));
        group.throughput(Throughput::Bytes(total_bytes));
        group.sample_size(10);

        for workers in [1usize, 2, 4, 8] {
            let config = PipelineConfig {
                codec,
                ..PipelineConfig::with_workers(workers)
            };
            let pipeline = FramePipeline::new(config).expect("pipeline config");

            group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
                b.iter(|| {
                    let sink = Vec::with_capacity(FRAME_COUNT * FRAME_SIZE);
                    let outcome = pipeline
                        .run(Arc::clone(&source), sink)
                        .expect("archive run");
                    black_box(outcome.stats.archive.crc32)
                });
            });
        }
        group.finish();
    }
}

criterion_group!(benches, bench_pool_sizes);
criterion_main!(benches);
