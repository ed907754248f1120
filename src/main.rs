use trigon::{app, config::Config};

fn main() -> anyhow::Result<()> {
    app::run(Config::default())
}
