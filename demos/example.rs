use std::sync::Arc;

use dragon_registry::loader::FileLoader;
use dragon_registry::{Config, Delegator, ErrorMode, Lookup, Table, Value, Writable};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Layered files: demos/config/*.toml, overridden by demos/config/production/*.toml
    let files = Arc::new(
        Config::builder()
            .with_loader(FileLoader::new("demos/config", "production", "toml")?)
            .with_error_mode(ErrorMode::Raise)
            .build(),
    );

    let mut globals = Table::new();
    globals.insert(
        "_ENV".into(),
        Value::Table(std::env::vars().map(|(k, v)| (k, Value::from(v))).collect()),
    );
    let runtime = Arc::new(Config::builder().with_globals(globals).writable(true).build());

    let delegator = Arc::new(Delegator::new());
    delegator.attach(files)?;
    delegator.attach(runtime)?;

    println!("App: {:?}", delegator.get("app.name")?);
    println!("Database URL: {:?}", delegator.get("database.url")?);
    println!("Home: {:?}", delegator.get("_ENV.HOME")?);

    delegator.set("app.started", Value::from(true))?;
    println!("Started: {:?}", delegator.get("app.started")?);

    Ok(())
}
