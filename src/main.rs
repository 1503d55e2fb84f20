fn main() -> anyhow::Result<()> {
    promptdeck::cli::run()
}
