use criterion::{criterion_group, criterion_main, Criterion};
use fxchain_core::{Color, FrameBuffer, FrameClock, ParamValue};
use fxchain_render::effects::{
    AfterimageEffect, ExprEffect, GrayscaleEffect, InvertEffect, VignetteEffect,
};
use fxchain_render::{Composer, Stage};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;

fn create_builtin_pipeline() -> Composer {
    let mut composer = Composer::with_resolution(WIDTH, HEIGHT);
    let stages = [
        Stage::new("gray", GrayscaleEffect).with_param("intensity", ParamValue::Float(0.5)),
        Stage::new("vignette", VignetteEffect),
        Stage::new("trail", AfterimageEffect::new()),
        Stage::new("invert", InvertEffect).with_param("intensity", ParamValue::Float(0.2)),
    ];
    for stage in stages {
        composer.add_stage(stage, None).unwrap();
    }
    composer
}

fn create_expr_pipeline() -> Composer {
    let mut composer = Composer::with_resolution(WIDTH, HEIGHT);
    let program = r#"
        @effect fireGlow(intensity: 1.0) {
            let flames = noise(3.0, 0.5)
                -> mask(0.3, 0.7)
                -> brightness(intensity)
                -> tint(#FF661A)
            blend(source(), flames, 0.5)
        }
    "#;
    composer
        .add_stage(Stage::new("fire", ExprEffect::new(program)), None)
        .unwrap();
    composer
}

fn bench_render_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("fxchain_composer");
    group.sample_size(10); // 30 frames per iteration

    let source = FrameBuffer::solid(WIDTH, HEIGHT, &Color::rgb(0.3, 0.5, 0.7));

    group.bench_function("builtins_30_frames", |b| {
        b.iter_custom(|iters| {
            let mut total_duration = std::time::Duration::from_nanos(0);

            for _ in 0..iters {
                let mut composer = create_builtin_pipeline();
                let mut clock = FrameClock::new(30.0, WIDTH, HEIGHT);

                let start = std::time::Instant::now();
                for _ in 0..30 {
                    let _frame = composer.render(&source, &clock.tick()).unwrap();
                }
                total_duration += start.elapsed();
            }

            total_duration
        });
    });

    group.bench_function("expr_fire_glow_30_frames", |b| {
        b.iter_custom(|iters| {
            let mut total_duration = std::time::Duration::from_nanos(0);

            for _ in 0..iters {
                let mut composer = create_expr_pipeline();
                let mut clock = FrameClock::new(30.0, WIDTH, HEIGHT);

                let start = std::time::Instant::now();
                for _ in 0..30 {
                    let _frame = composer.render(&source, &clock.tick()).unwrap();
                }
                total_duration += start.elapsed();
            }

            total_duration
        });
    });

    group.finish();
}

criterion_group!(benches, bench_render_pipeline);
criterion_main!(benches);
