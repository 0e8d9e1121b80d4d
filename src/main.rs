use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cfg = keylatch::config::Config::parse();
    keylatch::init_tracing(cfg.verbose);

    if cfg.wipe {
        return keylatch::wipe(&cfg);
    }
    if let Some(manifest) = &cfg.provision {
        return keylatch::provision(&cfg, manifest);
    }
    if cfg.list {
        return keylatch::list(&cfg, &mut std::io::stdout().lock());
    }
    if cfg.export {
        return keylatch::export(&cfg, &mut std::io::stdout().lock());
    }

    keylatch::runtime()?.block_on(keylatch::run(cfg))
}
