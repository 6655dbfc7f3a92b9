use raypick3d::bounding_volume::Aabb;
use raypick3d::math::{Point, Real, Transform, Vector};
use raypick3d::na;
use raypick3d::query::{Ray, RayCast};
use raypick3d::scene::Scene;
use raypick3d::shape::TriMesh;
use std::sync::Arc;

fn rand_point(rng: &mut oorandom::Rand32, scale: Real) -> Point<Real> {
    Point::new(
        rng.rand_float() as Real * scale,
        rng.rand_float() as Real * scale,
        rng.rand_float() as Real * scale,
    )
}

#[test]
fn unit_cube_hit_from_below() {
    let mut scene = Scene::new();
    let cube = scene.add_object(Aabb::new(
        Point::new(-0.5, -0.5, -0.5),
        Point::new(0.5, 0.5, 0.5),
    ));

    let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
    let hit = scene.cast_ray(&ray, Real::MAX).unwrap();

    assert_eq!(hit.object, cube);
    approx::assert_relative_eq!(hit.intersection.time_of_impact, 4.5);
    approx::assert_relative_eq!(hit.intersection.point, Point::new(0.0, 0.0, -0.5));
    approx::assert_relative_eq!(hit.intersection.normal, Vector::new(0.0, 0.0, -1.0));
}

#[test]
fn scene_queries_match_brute_force() {
    let mut rng = oorandom::Rand32::new(42);
    let mut scene = Scene::new();
    let mut objects = Vec::new();

    for _ in 0..300 {
        let center = rand_point(&mut rng, 50.0);
        let half_extents = Vector::from_fn(|_, _| 0.1 + rng.rand_float() as Real * 2.0);
        let aabb = Aabb::from_half_extents(center, half_extents);
        objects.push((scene.add_object(aabb), aabb));
    }

    scene.bvh().assert_well_formed();
    scene
        .bvh()
        .assert_contains_primitives(|id| *scene.iter().find(|(h, _)| h.index() == id).unwrap().1.aabb());

    for _ in 0..200 {
        let origin = rand_point(&mut rng, 60.0) - Vector::repeat(5.0);
        let dir = (rand_point(&mut rng, 2.0) - Vector::repeat(1.0)).coords;
        let ray = Ray::new(origin, dir);
        let max_toi = 10.0 + rng.rand_float() as Real * 100.0;

        let mut expected: Vec<_> = objects
            .iter()
            .filter_map(|(handle, aabb)| Some((*handle, aabb.cast_local_ray(&ray, max_toi)?)))
            .collect();
        expected.sort_by(|a, b| a.1.total_cmp(&b.1));

        let closest = scene.cast_ray(&ray, max_toi);
        assert_eq!(closest.is_some(), !expected.is_empty());
        assert_eq!(scene.intersects_ray(&ray, max_toi), !expected.is_empty());

        if let (Some(hit), Some(best)) = (closest, expected.first()) {
            approx::assert_relative_eq!(hit.intersection.time_of_impact, best.1, epsilon = 1.0e-4);
        }

        let all = scene.cast_ray_all(&ray, max_toi);
        assert_eq!(all.len(), expected.len());
        assert!(all
            .windows(2)
            .all(|w| w[0].intersection.time_of_impact <= w[1].intersection.time_of_impact));

        let mut found: Vec<_> = all.iter().map(|hit| hit.object).collect();
        let mut expected_handles: Vec<_> = expected.iter().map(|(handle, _)| *handle).collect();
        found.sort();
        expected_handles.sort();
        assert_eq!(found, expected_handles);
    }
}

#[test]
fn transformed_mesh_reports_world_space_hits() {
    // A triangle in the plane `x + y = 1`, crossing `z = 0`.
    let mesh = Arc::new(
        TriMesh::new(
            vec![
                Point::new(1.0, 0.0, -1.0),
                Point::new(0.0, 1.0, -1.0),
                Point::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap(),
    );

    let transform = Transform::from_matrix_unchecked(
        na::Matrix4::new_translation(&Vector::new(0.0, 0.0, 3.0))
            * na::Matrix4::new_nonuniform_scaling(&Vector::new(2.0, 1.0, 1.0)),
    );

    let mut scene = Scene::new();
    let wall = scene.add_mesh_object(mesh.clone(), transform).unwrap();
    // A second instance of the same mesh, far away.
    let _ = scene
        .add_mesh_object(
            mesh,
            Transform::from_matrix_unchecked(na::Matrix4::new_translation(&Vector::new(
                100.0, 0.0, 0.0,
            ))),
        )
        .unwrap();

    // In world-space, the plane is `x / 2 + y = 1`.
    let ray = Ray::new(Point::new(0.0, 0.0, 3.0), Vector::new(1.0, 1.0, 0.0));
    let hit = scene.cast_ray(&ray, Real::MAX).unwrap();

    assert_eq!(hit.object, wall);
    assert_eq!(hit.intersection.primitive, 0);
    approx::assert_relative_eq!(hit.intersection.time_of_impact, 2.0 / 3.0, epsilon = 1.0e-5);
    approx::assert_relative_eq!(
        hit.intersection.point,
        Point::new(2.0 / 3.0, 2.0 / 3.0, 3.0),
        epsilon = 1.0e-5
    );
    // The normal follows the non-uniform scaling and faces the ray.
    approx::assert_relative_eq!(
        hit.intersection.normal,
        -Vector::new(0.5, 1.0, 0.0).normalize(),
        epsilon = 1.0e-5
    );

    // Moving the object away makes the ray miss once the BVH follows.
    scene
        .set_object_pose(
            wall,
            Transform::from_matrix_unchecked(na::Matrix4::new_translation(&Vector::new(
                0.0, 0.0, 50.0,
            ))),
        )
        .unwrap();
    let _ = scene.maintain();
    assert!(scene.cast_ray(&ray, Real::MAX).is_none());
    assert!(!scene.intersects_ray(&ray, Real::MAX));
}

#[test]
fn all_hits_mix_meshes_and_boxes() {
    let quad = Arc::new(
        TriMesh::new(
            vec![
                Point::new(-1.0, -1.0, 0.0),
                Point::new(1.0, -1.0, 0.0),
                Point::new(1.0, 1.0, 0.0),
                Point::new(-1.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap(),
    );

    let mut scene = Scene::new();
    let mut expected = Vec::new();

    for i in 0..5 {
        let z = i as Real * 4.0;
        let translation = na::Matrix4::new_translation(&Vector::new(0.0, 0.0, z));
        let handle = scene
            .add_mesh_object(quad.clone(), Transform::from_matrix_unchecked(translation))
            .unwrap();
        expected.push((handle, z + 10.0));

        let handle = scene.add_object(Aabb::from_half_extents(
            Point::new(0.0, 0.0, z + 2.0),
            Vector::repeat(0.5),
        ));
        expected.push((handle, z + 1.5 + 10.0));
    }

    let ray = Ray::new(Point::new(0.1, 0.2, -10.0), Vector::z());
    let hits = scene.cast_ray_all(&ray, Real::MAX);
    assert_eq!(hits.len(), expected.len());

    for (hit, (handle, toi)) in hits.iter().zip(expected.iter()) {
        assert_eq!(hit.object, *handle);
        approx::assert_relative_eq!(hit.intersection.time_of_impact, *toi, epsilon = 1.0e-4);
    }

    // Removed objects disappear from the results.
    let removed = scene.remove_object(expected[0].0).unwrap();
    assert!(removed.mesh().is_some());
    let closest = scene.cast_ray(&ray, Real::MAX).unwrap();
    assert_eq!(closest.object, expected[1].0);
}

#[test]
fn mesh_with_a_nan_vertex_stays_pickable() {
    // The second triangle references a NaN vertex and is skipped.
    let mesh = Arc::new(
        TriMesh::new(
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
                Point::new(Real::NAN, 0.5, 0.0),
            ],
            vec![[0, 1, 2], [0, 3, 2]],
        )
        .unwrap(),
    );
    assert!(mesh.local_aabb().is_finite());

    let mut scene = Scene::new();
    let object = scene
        .add_mesh_object(mesh, Transform::identity())
        .unwrap();
    assert_eq!(scene.bvh().primitive_count(), 1);

    let ray = Ray::new(Point::new(0.25, 0.25, 5.0), -Vector::z());
    let hit = scene.cast_ray(&ray, Real::MAX).unwrap();
    assert_eq!(hit.object, object);
    assert_eq!(hit.intersection.primitive, 0);
    approx::assert_relative_eq!(hit.intersection.time_of_impact, 5.0);
    assert!(scene.intersects_ray(&ray, Real::MAX));
}

#[test]
fn object_with_an_invalid_aabb_is_never_hit() {
    let mut scene = Scene::new();
    let cube = scene.add_object(Aabb::new(
        Point::new(-0.5, -0.5, -0.5),
        Point::new(0.5, 0.5, 0.5),
    ));
    let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::z());
    assert!(scene.intersects_ray(&ray, Real::MAX));

    scene.set_object_aabb(cube, Aabb::new_invalid()).unwrap();
    assert!(scene.cast_ray(&ray, Real::MAX).is_none());
    assert!(!scene.intersects_ray(&ray, Real::MAX));

    let _ = scene.maintain();
    assert!(scene.cast_ray(&ray, Real::MAX).is_none());
    assert!(!scene.intersects_ray(&ray, Real::MAX));
    assert!(scene.cast_ray_all(&ray, Real::MAX).is_empty());

    // Inverted on a single axis.
    scene
        .set_object_aabb(
            cube,
            Aabb::new(Point::new(-0.5, 0.5, -0.5), Point::new(0.5, -0.5, 0.5)),
        )
        .unwrap();
    let _ = scene.maintain();
    assert!(scene.cast_ray(&ray, Real::MAX).is_none());
}
