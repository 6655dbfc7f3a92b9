use raypick3d::math::{Point, Real, Vector};
use raypick3d::partitioning::BvhBuildParams;
use raypick3d::query::{Ray, RayCast};
use raypick3d::shape::{MeshBvh, TriMesh};

/// A `n x n` grid of unit quads in the plane `z = height`.
fn grid(n: u32, height: Real) -> (Vec<Point<Real>>, Vec<[u32; 3]>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point::new(i as Real, j as Real, height));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let a = j * (n + 1) + i;
            let b = a + 1;
            let c = a + n + 2;
            let d = a + n + 1;
            indices.push([a, b, c]);
            indices.push([a, c, d]);
        }
    }

    (vertices, indices)
}

#[test]
fn moving_vertices_rebuilds_the_bvh_on_next_cast() {
    let (vertices, indices) = grid(16, 0.0);
    let mut mesh = TriMesh::new(vertices, indices).unwrap();
    let ray = Ray::new(Point::new(3.3, 7.6, 10.0), -Vector::z());

    let toi = mesh.cast_local_ray(&ray, Real::MAX).unwrap();
    approx::assert_relative_eq!(toi, 10.0);
    assert_eq!(mesh.cached_bvh().unwrap().generation(), 0);

    let (lifted, _) = grid(16, 4.0);
    mesh.set_vertices(lifted).unwrap();
    assert!(mesh.cached_bvh().is_none());

    let toi = mesh.cast_local_ray(&ray, Real::MAX).unwrap();
    approx::assert_relative_eq!(toi, 6.0);
    let bvh = mesh.cached_bvh().unwrap();
    assert_eq!(bvh.generation(), 1);
    bvh.bvh().assert_well_formed();
    bvh.bvh()
        .assert_contains_primitives(|id| mesh.triangle(id).local_aabb());
}

#[test]
fn worker_built_bvh_is_installed_unless_stale() {
    let (vertices, indices) = grid(8, 0.0);
    let params = BvhBuildParams {
        leaf_size: 2,
        ..BvhBuildParams::default()
    };
    let mut mesh = TriMesh::new(vertices, indices)
        .unwrap()
        .with_build_params(params);

    // Built from a snapshot, as a worker thread would.
    let stale = std::thread::scope(|s| s.spawn(|| MeshBvh::build(&mesh, &params)).join().unwrap());

    let (lifted, _) = grid(8, 1.0);
    mesh.set_vertices(lifted).unwrap();
    let stale = mesh.install_bvh(stale).unwrap_err();
    assert_eq!(stale.generation(), 0);
    assert!(mesh.cached_bvh().is_none());

    let fresh = std::thread::scope(|s| s.spawn(|| MeshBvh::build(&mesh, &params)).join().unwrap());
    assert!(mesh.install_bvh(fresh).is_ok());
    assert_eq!(mesh.cached_bvh().unwrap().generation(), 1);

    // A second install is rejected: the cache is already filled.
    let again = MeshBvh::build(&mesh, &params);
    assert!(mesh.install_bvh(again).is_err());

    let ray = Ray::new(Point::new(2.5, 2.25, -3.0), Vector::z());
    let toi = mesh.cast_local_ray(&ray, Real::MAX).unwrap();
    approx::assert_relative_eq!(toi, 4.0);
}

#[test]
fn degenerate_triangles_are_never_hit() {
    let vertices = vec![
        Point::new(0.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(0.0, 1.0, 0.0),
        Point::new(2.0, 0.0, 0.0),
        Point::new(Real::NAN, 0.0, 0.0),
    ];
    // One valid triangle, one collinear, one with a NaN vertex.
    let indices = vec![[0, 1, 2], [0, 1, 3], [0, 4, 2]];
    let mesh = TriMesh::new(vertices, indices).unwrap();

    assert_eq!(mesh.skipped_triangle_count(), 2);

    let ray = Ray::new(Point::new(0.25, 0.25, 1.0), -Vector::z());
    let hits = mesh.cast_local_ray_all(&ray, Real::MAX);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].primitive, 0);
}
