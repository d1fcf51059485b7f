use shard_iter::prelude::*;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let ty = ObjectType::new("people");
    let store = MemStore::new().with_type(ty.clone(), &[2]);

    store.put(&ty, Coordinate::new(0, 0), "alice", "alice v1")?;
    store.put(&ty, Coordinate::new(0, 1), "bob", "bob v1")?;
    let pinned = store.put(&ty, Coordinate::new(0, 0), "alice", "alice v2")?;
    store.put(&ty, Coordinate::new(0, 0), "carol", "carol v1")?;

    let view = ViewOpenOptions::new().open(&store)?;

    println!("shard 0 at {}:", pinned);
    for value in view.shard(ty.clone(), Coordinate::new(0, 0), pinned.into()) {
        println!("  {}", value?);
    }

    println!("subgroup 0, latest:");
    for value in view.subgroup(ty.clone(), 0, VersionSelector::Latest) {
        println!("  {}", value?);
    }

    println!("history of alice:");
    for value in view.history(ty, Coordinate::new(0, 0), "alice", VersionSelector::Latest) {
        println!("  {}", value?);
    }

    Ok(())
}
