fn main() -> anyhow::Result<()> {
    tabgraph::run()?;
    Ok(())
}
