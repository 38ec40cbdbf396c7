fn main() -> color_eyre::Result<()> {
    env_config::cli::main()
}
