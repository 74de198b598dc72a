use occtree::prelude::*;

fn main() -> Result<(), TreeError> {
    let mut tree: OcTree = OcTree::with_config(TreeConfig::new(0.1).with_capacity(1024))?;

    // A sensor at the origin sees a wall 2 meters ahead
    let origin = Point3d::ZERO;
    let scan: Vec<Point3d> = (-5..=5)
        .map(|i| Point3d::new(f64::from(i) * 0.1, 0.0, 2.0))
        .collect();

    let inserted = tree.insert_point_cloud(origin, scan, 5.0)?;
    assert_eq!(inserted, 11);

    let wall = tree.search(Point3d::new(0.0, 0.0, 2.0)).unwrap();
    assert!(tree[wall].occupancy.is_occupied());

    let hit = tree.cast_ray(origin, Point3d::new(0.0, 0.0, 1.0), false, -1.0)?;
    assert!(hit.hit);
    println!("wall hit at {} after {:.2} m", hit.end, hit.distance);

    let pruned = tree.prune();
    println!(
        "{} nodes ({} pruned), {} leaves, {} occupied volumes",
        tree.size(),
        pruned,
        tree.leaf_count(),
        tree.get_occupied(0).len()
    );

    println!(
        "map {} .. {}, {} bytes as a tree, {} bytes as a dense grid",
        tree.metric_min(),
        tree.metric_max(),
        tree.memory_usage(),
        tree.memory_full_grid()
    );

    Ok(())
}
