fn main() -> anyhow::Result<()> {
    braincloud_cli::run_cli()
}
