//! Benchmarks for the network building blocks.
//!
//! Selector parsing runs without libtorch; the forward-pass benchmarks need
//! the `tch-backend` feature.
//!
//! Run with:
//!
//! ```bash
//! cargo bench -p facestyle-nn --features tch-backend
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use facestyle_nn::{ActKind, NormKind};

// ─────────────────────────────────────────────────────────────────────────────
// Selector parsing
// ─────────────────────────────────────────────────────────────────────────────

fn bench_parse_selectors(c: &mut Criterion) {
    let tags = ["bn", "in", "none", "relu", "lrelu", "tanh", "sig"];
    c.bench_function("parse_selectors", |b| {
        b.iter(|| {
            for tag in tags {
                let _ = black_box(tag).parse::<NormKind>();
                let _ = black_box(tag).parse::<ActKind>();
            }
        });
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Forward passes (tch)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "tch-backend")]
mod forward {
    use criterion::{black_box, BenchmarkId, Criterion};
    use facestyle_nn::{AdaINResBlock, AdaINResBlockConfig, ConvBlock, ConvBlockConfig};
    use tch::{nn, nn::ModuleT, Device, Kind, Tensor};

    /// One decoder stage at each upsampling factor used by the generator.
    pub fn bench_adain_resblock(c: &mut Criterion) {
        let mut group = c.benchmark_group("adain_resblock_256_to_128");
        let feat = Tensor::randn([4, 256, 16, 16], (Kind::Float, Device::Cpu));
        let style = Tensor::randn([4, 512], (Kind::Float, Device::Cpu));
        for scale in [1.0_f64, 2.0] {
            let vs = nn::VarStore::new(Device::Cpu);
            let cfg = AdaINResBlockConfig::new(256, 128).with_scale_factor(scale);
            let block = AdaINResBlock::new(&vs.root(), &cfg).expect("valid config");
            group.bench_with_input(BenchmarkId::from_parameter(scale), &scale, |b, _| {
                b.iter(|| tch::no_grad(|| block.forward(black_box(&feat), black_box(&style))));
            });
        }
        group.finish();
    }

    pub fn bench_conv_block(c: &mut Criterion) {
        let vs = nn::VarStore::new(Device::Cpu);
        let block = ConvBlock::new(&vs.root(), &ConvBlockConfig::new(64, 128)).expect("valid config");
        let x = Tensor::randn([4, 64, 64, 64], (Kind::Float, Device::Cpu));
        c.bench_function("conv_block_64_to_128_stride2", |b| {
            b.iter(|| tch::no_grad(|| block.forward_t(black_box(&x), false)));
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Criterion registration
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "tch-backend")]
criterion_group!(
    benches,
    bench_parse_selectors,
    forward::bench_adain_resblock,
    forward::bench_conv_block,
);

#[cfg(not(feature = "tch-backend"))]
criterion_group!(benches, bench_parse_selectors);

criterion_main!(benches);
