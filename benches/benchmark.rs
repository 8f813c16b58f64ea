use std::array::from_fn;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dynbvh::prelude::*;
use rand::Rng;

const RANGE: usize = 4096;
const WORLD: f32 = 1024.0;
const MARGIN: f32 = 0.5;

fn random_point(rnd: &mut impl Rng) -> TVec3<f32> {
    TVec3::new(
        rnd.gen_range(0.0..=WORLD),
        rnd.gen_range(0.0..=WORLD),
        rnd.gen_range(0.0..=WORLD),
    )
}

fn random_boxes() -> [Aabb<f32>; RANGE] {
    let mut rnd = rand::thread_rng();
    from_fn(|_| {
        let extents = TVec3::splat(rnd.gen_range(0.5f32..=4.0));
        Aabb::new(random_point(&mut rnd), extents)
    })
}

fn random_rays() -> [Ray<f32>; RANGE] {
    let mut rnd = rand::thread_rng();
    from_fn(|_| {
        let origin = random_point(&mut rnd);

        let x_dir = rnd.gen_range(0.1f32..=1.0);
        let y_dir = rnd.gen_range(0.1f32..=1.0);
        let z_dir = rnd.gen_range(0.1f32..=1.0);
        Ray::new(origin, TVec3::new(x_dir, y_dir, z_dir))
    })
}

fn filled(boxes: &[Aabb<f32>; RANGE]) -> Bvh<f32, u32> {
    let mut tree = Bvh::with_capacity(RANGE);
    for (i, aabb) in boxes.iter().enumerate() {
        tree.insert(i as u32, *aabb, MARGIN).unwrap();
    }
    tree
}

fn bvh_insert(boxes: &[Aabb<f32>; RANGE]) {
    let _ = filled(boxes);
}

fn bvh_remove(boxes: &[Aabb<f32>; RANGE]) {
    let mut tree = filled(boxes);

    for object in 0..RANGE as u32 {
        tree.remove(object).unwrap();
    }
}

fn bvh_move(boxes: &[Aabb<f32>; RANGE]) {
    let mut tree = filled(boxes);
    let shift = TVec3::splat(0.25);

    for step in 0..4 {
        for (i, aabb) in boxes.iter().enumerate() {
            let offset = shift * (step as f32 + 1.0);
            let moved = Aabb::from_min_max(aabb.min + offset, aabb.max + offset);
            tree.move_object(i as u32, moved, MARGIN).unwrap();
        }
    }
}

fn bvh_ray_cast(tree: &Bvh<f32, u32>, rays: &[Ray<f32>; RANGE]) {
    for ray in rays {
        let _ = tree.ray_cast_nearest(ray, WORLD);
    }
}

fn bvh_sphere_intersection(tree: &Bvh<f32, u32>, boxes: &[Aabb<f32>; RANGE]) {
    for aabb in boxes {
        let _ = tree.intersect_sphere(&Sphere::new(aabb.center(), 8.0));
    }
}

fn bvh_box_intersection(tree: &Bvh<f32, u32>, boxes: &[Aabb<f32>; RANGE]) {
    for aabb in boxes {
        let _ = tree.intersect_aabb(&aabb.expanded(4.0));
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let boxes = random_boxes();
    let rays = random_rays();
    let ids: Vec<u32> = (0..RANGE as u32).collect();

    c.bench_function("bvh insert", |b| b.iter(|| bvh_insert(&boxes)));

    c.bench_function("bvh remove", |b| b.iter(|| bvh_remove(&boxes)));

    c.bench_function("bvh move", |b| b.iter(|| bvh_move(&boxes)));

    let mut group = c.benchmark_group("bvh build");
    for strategy in [
        BuildStrategy::Fast,
        BuildStrategy::Balanced,
        BuildStrategy::Accurate,
    ] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{strategy:?}")),
            &strategy,
            |b, strategy| b.iter(|| Bvh::from_objects(&ids, &boxes, *strategy)),
        );
    }
    group.finish();

    let tree = filled(&boxes);

    c.bench_function("bvh ray cast", |b| b.iter(|| bvh_ray_cast(&tree, &rays)));

    c.bench_function("bvh sphere intersection", |b| {
        b.iter(|| bvh_sphere_intersection(&tree, &boxes))
    });

    c.bench_function("bvh box intersection", |b| {
        b.iter(|| bvh_box_intersection(&tree, &boxes))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
