use raypick3d::bounding_volume::Aabb;
use raypick3d::math::{Point, Real, Transform, Vector};
use raypick3d::na;
use raypick3d::query::Ray;
use raypick3d::scene::Scene;
use raypick3d::shape::TriMesh;
use std::sync::Arc;

fn sphere_like_mesh(subdivisions: u32) -> TriMesh {
    // A closed "UV sphere" of radius 1.
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let rings = subdivisions;
    let sectors = 2 * subdivisions;

    for r in 0..=rings {
        let phi = core::f64::consts::PI as Real * r as Real / rings as Real;
        for s in 0..sectors {
            let theta = 2.0 * core::f64::consts::PI as Real * s as Real / sectors as Real;
            vertices.push(Point::new(
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            ));
        }
    }

    for r in 0..rings {
        for s in 0..sectors {
            let a = r * sectors + s;
            let b = r * sectors + (s + 1) % sectors;
            let c = a + sectors;
            let d = b + sectors;
            indices.push([a, c, d]);
            indices.push([a, d, b]);
        }
    }

    TriMesh::new(vertices, indices).unwrap()
}

#[test]
fn concurrent_ray_casts_share_one_lazy_mesh_bvh() {
    let mesh = Arc::new(sphere_like_mesh(24));
    let mut scene = Scene::new();

    for i in 0..10 {
        let transform = Transform::from_matrix_unchecked(na::Matrix4::new_translation(
            &Vector::new(i as Real * 3.0, 0.0, 0.0),
        ));
        let _ = scene.add_mesh_object(mesh.clone(), transform).unwrap();
    }
    let _ = scene.add_object(Aabb::new(
        Point::new(-2.0, -3.0, -2.0),
        Point::new(30.0, -2.0, 2.0),
    ));

    assert!(mesh.cached_bvh().is_none());

    std::thread::scope(|s| {
        for t in 0..8 {
            let scene = &scene;
            let _ = s.spawn(move || {
                for i in 0..50 {
                    let x = (t * 50 + i) as Real * 27.0 / 400.0;
                    let ray = Ray::new(Point::new(x, 10.0, 0.0), -Vector::y());
                    let hit = scene.cast_ray(&ray, Real::MAX).unwrap();
                    assert!(hit.intersection.time_of_impact >= 9.0 - 1.0e-3);
                    assert!(hit.intersection.time_of_impact <= 12.0 + 1.0e-3);
                    assert!(scene.intersects_ray(&ray, Real::MAX));
                }
            });
        }
    });

    // All the threads used the same cached BVH.
    let bvh = mesh.cached_bvh().unwrap();
    assert_eq!(bvh.generation(), 0);
    assert_eq!(bvh.skipped_count(), mesh.skipped_triangle_count());
}

#[cfg(feature = "parallel")]
#[test]
fn mesh_bvhs_are_built_ahead_of_time() {
    let meshes: Vec<_> = (4..8).map(|n| Arc::new(sphere_like_mesh(n))).collect();
    let mut scene = Scene::new();

    for (i, mesh) in meshes.iter().enumerate() {
        let transform = Transform::from_matrix_unchecked(na::Matrix4::new_translation(
            &Vector::new(0.0, 0.0, i as Real * 5.0),
        ));
        let _ = scene.add_mesh_object(mesh.clone(), transform).unwrap();
    }

    scene.build_mesh_bvhs();
    assert!(meshes.iter().all(|mesh| mesh.cached_bvh().is_some()));
}
