use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tracejit::{jit, with_jit_disabled, Array, Result, Shape, Value};

fn mlp_like(args: &[Value]) -> Result<Vec<Value>> {
    let (x, w) = (&args[0], &args[1]);
    let h = x.mul(w)?.add(&Value::scalar(0.1))?.tanh()?;
    Ok(vec![h.mul(&h)?.mean_all()?])
}

fn input(size: usize) -> Array {
    Array::from_vec((0..size).map(|i| i as f32 / size as f32).collect(), Shape::new(vec![size]))
}

fn bench_cache_hit_vs_eager(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_hit_vs_eager");
    for size in [16usize, 1024, 65536] {
        let x = input(size);
        let w = input(size);
        let f = jit("mlp_like", 2, mlp_like);
        f.call(&[x.clone(), w.clone()]).unwrap();

        group.bench_with_input(BenchmarkId::new("cached", size), &size, |b, _| {
            b.iter(|| f.call(black_box(&[x.clone(), w.clone()])).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("eager", size), &size, |b, _| {
            b.iter(|| with_jit_disabled(|| f.call(black_box(&[x.clone(), w.clone()]))).unwrap())
        });
    }
    group.finish();
}

fn bench_trace_and_compile(c: &mut Criterion) {
    let x = input(128);
    let w = input(128);
    c.bench_function("trace+compile 128", |b| {
        b.iter(|| {
            let f = jit("mlp_like", 2, mlp_like);
            f.call(black_box(&[x.clone(), w.clone()])).unwrap()
        })
    });

    let f = jit("mlp_like", 2, mlp_like);
    c.bench_function("lower 128", |b| b.iter(|| f.lower(black_box(&[x.clone(), w.clone()])).unwrap()));
}

criterion_group!(benches, bench_cache_hit_vs_eager, bench_trace_and_compile);
criterion_main!(benches);
