fn main() -> color_eyre::Result<()> {
    env_config::cli::shell_main()
}
