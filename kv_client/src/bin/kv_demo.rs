use std::{collections::HashMap, process::exit, str::FromStr, time::Duration};

use kv_bucket::{Bucket, BucketPtr};
use kv_client::{Collection, Config, ExpiryPolicy, MutateOptions};
use kv_common::{
    Content, Expiry, GetOptions, InsertOptions, KvError, RemoveOptions, ReplaceOptions, ScanType,
    UpsertOptions,
};
use serde_json::{json, Value};
use tracing::{error, info, Level};

type Document = HashMap<String, Value>;

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => match Config::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{path}: {e}");
                exit(1);
            }
        },
        None => Config::default(),
    };

    let level = Level::from_str(&config.logger.level).unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(e) = run(&config) {
        error!("Demo failed: {}", e);
        exit(1);
    }
}

fn run(config: &Config) -> Result<(), KvError> {
    let bucket: BucketPtr = Bucket::new(config.bucket.clone())?;
    let collection = Collection::new(bucket);
    info!("Using bucket {}", collection.store().name());

    collection.upsert(
        "alice",
        &json!({"favoriteColor": "blue"}),
        &UpsertOptions::default(),
    )?;

    match collection.insert(
        "alice",
        &json!({"favoriteColor": "blue"}),
        &InsertOptions::default(),
    ) {
        Err(KvError::DocumentExists(_)) => {
            println!("Insert failed because the document already exists.")
        }
        other => {
            other?;
        }
    }

    collection.replace(
        "alice",
        &json!({"favoriteColor": "red"}),
        &ReplaceOptions::default(),
    )?;

    let result = collection.get("alice")?;
    let content: Document = result.content_as()?;
    println!(
        "The character's favorite color is {}",
        content["favoriteColor"]
    );
    println!(
        "Content in the bucket: {}",
        String::from_utf8_lossy(&result.content.bytes)
    );

    let three_hours = Expiry::of(Duration::from_secs(3 * 60 * 60));
    collection.upsert(
        "alice",
        &json!({"favoriteColor": "red"}),
        &UpsertOptions::default().expiry(three_hours),
    )?;
    collection.touch("alice", three_hours)?;
    collection.get_and_touch("alice", three_hours)?;
    collection.replace(
        "alice",
        &json!({"favoriteColor": "red"}),
        &ReplaceOptions::default().preserve_expiry(true),
    )?;

    let result = collection.get_with_options("alice", &GetOptions::default().with_expiry(true))?;
    match result.expiry {
        Some(Expiry::None) => println!("Document does not expire."),
        Some(Expiry::Absolute(instant)) => println!("Document expires at {instant:?}."),
        _ => println!("Oops, forgot to ask for the expiry."),
    }

    collection.mutate_as(
        "alice",
        &MutateOptions::default()
            .expiry(ExpiryPolicy::Preserve)
            .retry(config.retry),
        |mut old: Document| {
            old.insert("favoriteFood".to_string(), json!("hamburger"));
            old
        },
    )?;
    println!(
        "After mutate: {}",
        String::from_utf8_lossy(&collection.get("alice")?.content.bytes)
    );

    let locked = collection.get_and_lock("alice", Duration::from_secs(15))?;
    let mut content: Document = locked.content_as()?;
    content.insert("favoriteDrink".to_string(), json!("tea"));
    collection.replace(
        "alice",
        &content,
        &ReplaceOptions::default().cas(locked.cas),
    )?;

    for id in ["airline_10", "airline_10123"] {
        collection.upsert_content(
            id,
            Content::raw_json(format!(r#"{{"id":"{id}","type":"airline"}}"#)),
            &UpsertOptions::default(),
        )?;
    }
    let ids = ["airline_10", "airline_10123", "airline_10226"];
    let mut results: Vec<_> = collection
        .bulk_get(ids, config.bulk.max_concurrency)
        .into_iter()
        .collect();
    results.sort_by(|(a, _), (b, _)| a.cmp(b));
    for (id, result) in results {
        match result {
            Ok(result) => println!("{id} = {}", String::from_utf8_lossy(&result.content.bytes)),
            Err(e) => println!("{id} = {e}"),
        }
    }

    println!(
        "All ids: {:?}",
        collection.scan_ids(&ScanType::range())?
    );
    println!(
        "Airlines: {:?}",
        collection.scan_ids(&ScanType::prefix("airline_"))?
    );
    println!(
        "Sample: {:?}",
        collection.scan_ids(&ScanType::sample(1))?
    );

    match collection.remove("bob", &RemoveOptions::default()) {
        Err(KvError::DocumentNotFound(_)) => {
            println!("Remove failed because there was no document to remove.")
        }
        other => {
            other?;
        }
    }

    Ok(())
}
