fn main() -> anyhow::Result<()> {
    surfacescan_lib::run()
}
