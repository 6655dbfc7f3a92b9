use raypick3d::bounding_volume::Aabb;
use raypick3d::math::{Point, Real, Vector};
use raypick3d::na;
use raypick3d::query::{AabbClassification, Frustum};
use raypick3d::scene::Scene;

fn unit_box(center: Point<Real>) -> Aabb {
    Aabb::from_half_extents(center, Vector::repeat(0.5))
}

#[test]
fn frustum_selects_three_of_ten_objects() {
    let frustum = Frustum::from_aabb(&Aabb::new(
        Point::new(-0.5, -1.0, -1.0),
        Point::new(6.5, 1.0, 1.0),
    ));

    for seed in 0..8 {
        // Insert the boxes in a shuffled order so the tree shape differs for every seed.
        let mut rng = oorandom::Rand32::new(seed);
        let mut order: Vec<u32> = (0..10).collect();
        for i in (1..order.len()).rev() {
            let j = rng.rand_range(0..i as u32 + 1) as usize;
            order.swap(i, j);
        }

        let mut scene = Scene::new();
        let mut handles = vec![None; 10];
        for &i in &order {
            handles[i as usize] =
                Some(scene.add_object(unit_box(Point::new(3.0 * i as Real, 0.0, 0.0))));
        }
        let handles: Vec<_> = handles.into_iter().flatten().collect();

        let mut visible = scene.frustum_query(&frustum);
        visible.sort();
        let mut expected = handles[..3].to_vec();
        expected.sort();
        assert_eq!(visible, expected, "insertion order {:?}", order);
    }
}

#[test]
fn camera_frustum_culls_behind_and_beyond() {
    let projection = na::Perspective3::new(16.0 / 9.0, 1.0, 0.1, 100.0);
    let view = na::Matrix4::look_at_rh(
        &Point::new(0.0, 2.0, 10.0),
        &Point::new(0.0, 2.0, 0.0),
        &Vector::y(),
    );
    let frustum = Frustum::from_view_projection(&(projection.to_homogeneous() * view)).unwrap();

    let mut scene = Scene::new();
    let in_front = scene.add_object(unit_box(Point::new(0.0, 2.0, 0.0)));
    let straddling_far_plane = scene.add_object(unit_box(Point::new(0.0, 2.0, -90.0)));
    let _behind = scene.add_object(unit_box(Point::new(0.0, 2.0, 20.0)));
    let _too_far = scene.add_object(unit_box(Point::new(0.0, 2.0, -200.0)));
    let _left = scene.add_object(unit_box(Point::new(-100.0, 2.0, 0.0)));
    let _below = scene.add_object(unit_box(Point::new(0.0, -100.0, 0.0)));

    assert_eq!(
        frustum.classify_aabb(scene.get(in_front).unwrap().aabb()),
        AabbClassification::Inside
    );
    assert_eq!(
        frustum.classify_aabb(scene.get(straddling_far_plane).unwrap().aabb()),
        AabbClassification::Intersecting
    );

    let mut visible = scene.frustum_query(&frustum);
    visible.sort();
    assert_eq!(visible, vec![in_front, straddling_far_plane]);
}

#[test]
fn frustum_query_matches_brute_force() {
    let mut rng = oorandom::Rand32::new(7);
    let mut scene = Scene::new();
    let mut objects = Vec::new();

    for _ in 0..500 {
        let center = Point::new(
            rng.rand_float() as Real * 200.0 - 100.0,
            rng.rand_float() as Real * 200.0 - 100.0,
            rng.rand_float() as Real * 200.0 - 100.0,
        );
        let aabb = Aabb::from_half_extents(center, Vector::repeat(rng.rand_float() as Real * 4.0));
        objects.push((scene.add_object(aabb), aabb));
    }

    for i in 0..20 {
        let angle = i as Real * 0.3;
        let eye = Point::new(angle.cos() * 50.0, 10.0, angle.sin() * 50.0);
        let projection = na::Perspective3::new(1.0, 0.8, 1.0, 120.0);
        let view = na::Matrix4::look_at_rh(&eye, &Point::origin(), &Vector::y());
        let frustum = Frustum::from_view_projection(&(projection.to_homogeneous() * view)).unwrap();

        let mut expected: Vec<_> = objects
            .iter()
            .filter(|(_, aabb)| frustum.intersects_aabb(aabb))
            .map(|(handle, _)| *handle)
            .collect();
        let mut found = scene.frustum_query(&frustum);
        expected.sort();
        found.sort();
        assert_eq!(found, expected);
    }
}
