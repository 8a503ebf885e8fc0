use super::common::SweepCommonArgs;

#[derive(clap::Args, Clone, Debug)]
pub struct N1SweepArgs {
    /// Fixed |VH| size (host graph vertices)
    #[arg(long)]
    pub n2: usize,

    /// Starting |VG| size
    #[arg(long, default_value_t = 2)]
    pub n1_start: usize,

    /// Ending |VG| size (inclusive)
    #[arg(long, default_value_t = 9)]
    pub n1_end: usize,

    /// Step for |VG|
    #[arg(long, default_value_t = 1)]
    pub n1_step: usize,

    #[command(flatten)]
    pub common: SweepCommonArgs,
}

#[derive(clap::Args, Clone, Debug)]
pub struct N2SweepArgs {
    /// Fixed |VG| size (pattern graph vertices)
    #[arg(long)]
    pub n1: usize,

    /// Starting |VH| size
    #[arg(long)]
    pub n2_start: usize,

    /// Ending |VH| size (inclusive)
    #[arg(long)]
    pub n2_end: usize,

    /// Step for |VH|
    #[arg(long, default_value_t = 1)]
    pub n2_step: usize,

    #[command(flatten)]
    pub common: SweepCommonArgs,
}
