fn main() -> anyhow::Result<()> {
    markshelf::cli::run()
}
