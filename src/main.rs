//! ATOM BIOS scan CLI
//!
//! Command-line tool for listing ATOM BIOS tables, searching them for
//! tunable parameters, and reading or patching individual fields.

use anyhow::{bail, Context};
use atombios_scan::formatter::{HumanFormatter, JsonFormatter, ReportFormatter, ShortFormatter};
use atombios_scan::{
    analyze_bytes, format_legacy_relative, load_image, parse_offset, read_field,
    to_legacy_relative, write_field, AtomError, FieldWidth, RomReport, ScanConfig, ScanStrategy,
};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// ATOM BIOS table explorer and tuning-parameter scanner.
///
/// Locates the ATOM header and master data table in a GPU firmware image,
/// lists its sub-tables, and ranks offsets that plausibly hold power,
/// voltage and clock values.
#[derive(Parser, Debug)]
#[command(name = "atom-scan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(short, long, global = true, default_value = "human")]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (only output essential info)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the header, master table and sub-tables
    Tables {
        /// Firmware image
        file: PathBuf,
    },
    /// Search sub-tables for parameter candidates
    Scan(ScanArgs),
    /// Read one field
    Read {
        /// Firmware image
        file: PathBuf,

        /// Offset: decimal, 0x hex, or rel:<offset> from the legacy base
        #[arg(short, long)]
        offset: String,

        /// Field width in bits
        #[arg(short, long, default_value = "16")]
        width: Width,
    },
    /// Write one field and save the image
    Write {
        /// Firmware image
        file: PathBuf,

        /// Offset: decimal, 0x hex, or rel:<offset> from the legacy base
        #[arg(short, long)]
        offset: String,

        /// Field width in bits
        #[arg(short, long, default_value = "16")]
        width: Width,

        /// Value to store
        #[arg(long)]
        value: u32,

        /// Save to this file instead of overwriting the input
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug)]
struct ScanArgs {
    /// Firmware image
    file: PathBuf,

    /// Scan strategy
    #[arg(short, long, default_value = "smart")]
    mode: ScanMode,

    /// Target value for exact scans
    #[arg(short, long)]
    target: Option<u32>,

    /// Threshold preset
    #[arg(long, default_value = "default")]
    preset: Preset,

    /// JSON file with scan configuration (overrides the preset)
    #[arg(long, env = "ATOM_SCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Neighborhood half-width in bytes
    #[arg(long)]
    window: Option<usize>,

    /// Minimum size of tables scanned by smart and exact modes
    #[arg(long)]
    min_table_size: Option<u16>,

    /// Maximum number of candidates kept (also caps the smart scan)
    #[arg(short, long)]
    limit: Option<usize>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
    /// Compact single-line output
    Short,
}

/// Scan strategy options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScanMode {
    /// Every in-range value, capped per kind
    Naive,
    /// Density-scored and ranked (default)
    Smart,
    /// Exact target under fixed-point scales
    Exact,
    /// Exact target ranked by neighborhood density
    ExactScored,
}

/// Threshold presets.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// Stock thresholds
    Default,
    /// Higher score thresholds
    Strict,
    /// Lower thresholds, larger caps
    Permissive,
}

/// Field widths.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Width {
    #[value(name = "8")]
    W8,
    #[value(name = "16")]
    W16,
    #[value(name = "32")]
    W32,
}

impl From<Width> for FieldWidth {
    fn from(width: Width) -> Self {
        match width {
            Width::W8 => FieldWidth::U8,
            Width::W16 => FieldWidth::U16,
            Width::W32 => FieldWidth::U32,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging if verbose
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("atombios_scan=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Tables { file } => {
            let data = read_image(file)?;
            let report = analyze_bytes(&data, None, &ScanConfig::default());
            print!("{}", formatter(cli, 0).format_report(&report, file));
            if report.header_offset.is_none() {
                return Err(AtomError::HeaderNotFound.into());
            }
            Ok(())
        }
        Command::Scan(args) => scan(cli, args),
        Command::Read {
            file,
            offset,
            width,
        } => {
            let data = read_image(file)?;
            let offset = parse_offset(offset)?;
            let width = FieldWidth::from(*width);
            let value = read_field(&data, offset, width)?;
            let bytes = &data[offset..offset + width.bytes()];
            if cli.quiet {
                println!("{}", value);
            } else {
                println!("{}", describe_field(offset, width, value, bytes));
            }
            Ok(())
        }
        Command::Write {
            file,
            offset,
            width,
            value,
            output,
        } => {
            let mut data = read_image(file)?;
            let offset = parse_offset(offset)?;
            let width = FieldWidth::from(*width);
            let old = read_field(&data, offset, width)?;
            write_field(&mut data, offset, width, *value)?;

            let target = output.as_deref().unwrap_or(file.as_path());
            std::fs::write(target, &data)
                .with_context(|| format!("writing {}", target.display()))?;
            if !cli.quiet {
                println!(
                    "0x{:X} {}: {} -> {} saved to {}",
                    offset,
                    width,
                    old,
                    value,
                    target.display()
                );
            }
            Ok(())
        }
    }
}

fn scan(cli: &Cli, args: &ScanArgs) -> anyhow::Result<()> {
    let report = scan_report(args)?;
    let out = formatter(cli, args.limit.unwrap_or(0));
    print!("{}", out.format_report(&report, &args.file));
    Ok(())
}

fn scan_report(args: &ScanArgs) -> anyhow::Result<RomReport> {
    let config = scan_config(args)?;
    let strategy = match args.mode {
        ScanMode::Naive => ScanStrategy::Naive,
        ScanMode::Smart => ScanStrategy::Smart,
        ScanMode::Exact => {
            let Some(target) = args.target else {
                bail!("--target is required for exact scans");
            };
            ScanStrategy::Exact { target }
        }
        ScanMode::ExactScored => ScanStrategy::ExactScored {
            target: args.target.unwrap_or(config.exact_target),
        },
    };

    let data = read_image(&args.file)?;
    let mut report = analyze_bytes(&data, Some(strategy), &config);
    if report.header_offset.is_none() {
        return Err(AtomError::HeaderNotFound.into());
    }
    if let Some(limit) = args.limit {
        report.candidates.truncate(limit);
    }
    Ok(report)
}

fn scan_config(args: &ScanArgs) -> anyhow::Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            ScanConfig::from_json(&text)?
        }
        None => match args.preset {
            Preset::Default => ScanConfig::new(),
            Preset::Strict => ScanConfig::strict(),
            Preset::Permissive => ScanConfig::permissive(),
        },
    };
    if let Some(window) = args.window {
        config.window = window;
    }
    if let Some(min_size) = args.min_table_size {
        config.large_table_min_size = min_size;
    }
    if let Some(limit) = args.limit {
        config.smart_result_cap = limit;
    }
    config.validate()?;
    Ok(config)
}

fn describe_field(offset: usize, width: FieldWidth, value: u32, bytes: &[u8]) -> String {
    format!(
        "0x{:X} (rel {}) {} = {} (0x{:X}) [{}]",
        offset,
        format_legacy_relative(to_legacy_relative(offset), 0),
        width,
        value,
        value,
        hex::encode_upper(bytes)
    )
}

fn read_image(path: &Path) -> anyhow::Result<Vec<u8>> {
    load_image(path).with_context(|| format!("loading {}", path.display()))
}

fn formatter(cli: &Cli, limit: usize) -> Box<dyn ReportFormatter> {
    match cli.format {
        OutputFormat::Human => {
            let mut human = if cli.quiet {
                HumanFormatter::quiet()
            } else if cli.verbose {
                HumanFormatter::verbose()
            } else {
                HumanFormatter::new()
            };
            if limit > 0 {
                human.limit = limit;
            }
            Box::new(human)
        }
        OutputFormat::Json => Box::new(JsonFormatter::new()),
        OutputFormat::Short => Box::new(ShortFormatter::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atombios_scan::LEGACY_BASE;
    use std::ffi::OsString;

    /// Header at the legacy base, one 0x800-byte table at rel 0x1000 holding
    /// `count` power values.
    fn image_with_power_block(count: usize) -> Vec<u8> {
        let mut data = vec![0u8; LEGACY_BASE + 0x4000];
        let h = LEGACY_BASE;
        data[h..h + 2].copy_from_slice(&0x40u16.to_le_bytes());
        data[h + 4..h + 8].copy_from_slice(b"ATOM");
        data[h + 0x20..h + 0x22].copy_from_slice(&0x100u16.to_le_bytes());
        let m = LEGACY_BASE + 0x100;
        data[m..m + 2].copy_from_slice(&6u16.to_le_bytes());
        data[m + 4..m + 6].copy_from_slice(&0x1000u16.to_le_bytes());
        let t = LEGACY_BASE + 0x1000;
        data[t..t + 2].copy_from_slice(&0x800u16.to_le_bytes());
        for i in 0..count {
            let pos = t + 0x100 + i * 2;
            data[pos..pos + 2].copy_from_slice(&300u16.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_args_parsing() {
        let cli = Cli::try_parse_from(["atom-scan", "tables", "vbios.rom"]).unwrap();
        assert!(matches!(cli.command, Command::Tables { .. }));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_scan_defaults() {
        let cli = Cli::try_parse_from(["atom-scan", "scan", "vbios.rom"]).unwrap();
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.mode, ScanMode::Smart);
        assert_eq!(args.limit, None);
        assert_eq!(scan_config(&args).unwrap(), ScanConfig::new());
    }

    #[test]
    fn test_scan_overrides() {
        let cli = Cli::try_parse_from([
            "atom-scan",
            "scan",
            "vbios.rom",
            "-m",
            "exact-scored",
            "--preset",
            "strict",
            "--window",
            "32",
            "--min-table-size",
            "512",
        ])
        .unwrap();
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.mode, ScanMode::ExactScored);
        let config = scan_config(&args).unwrap();
        assert_eq!(config.window, 32);
        assert_eq!(config.large_table_min_size, 512);
        assert_eq!(config.power.min_score, ScanConfig::strict().power.min_score);
    }

    #[test]
    fn test_read_width_parsing() {
        let cli = Cli::try_parse_from([
            "atom-scan", "-f", "json", "read", "vbios.rom", "-o", "rel:0x10", "-w", "32",
        ])
        .unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        let Command::Read { width, offset, .. } = cli.command else {
            panic!("expected read");
        };
        assert_eq!(FieldWidth::from(width), FieldWidth::U32);
        assert_eq!(parse_offset(&offset).unwrap(), LEGACY_BASE + 0x10);
    }

    #[test]
    fn test_write_roundtrip_through_file() {
        let mut data = vec![0u8; atombios_scan::MIN_IMAGE_LEN];
        data[LEGACY_BASE + 0x10] = 0x11;
        let input = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(input.path(), &data).unwrap();
        let output = tempfile::NamedTempFile::new().unwrap();

        let argv: Vec<OsString> = vec![
            "atom-scan".into(),
            "-q".into(),
            "write".into(),
            input.path().into(),
            "-o".into(),
            "rel:0x10".into(),
            "--value".into(),
            "300".into(),
            "--output".into(),
            output.path().into(),
        ];
        let cli = Cli::try_parse_from(argv).unwrap();
        run(&cli).unwrap();

        let written = std::fs::read(output.path()).unwrap();
        assert_eq!(read_field(&written, LEGACY_BASE + 0x10, FieldWidth::U16).unwrap(), 300);
        assert_eq!(std::fs::read(input.path()).unwrap(), data);
    }

    #[test]
    fn test_write_out_of_bounds_fails() {
        let data = vec![0u8; atombios_scan::MIN_IMAGE_LEN];
        let input = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(input.path(), &data).unwrap();

        let argv: Vec<OsString> = vec![
            "atom-scan".into(),
            "-q".into(),
            "write".into(),
            input.path().into(),
            "-o".into(),
            "rel:0x1FF".into(),
            "--value".into(),
            "1".into(),
        ];
        let cli = Cli::try_parse_from(argv).unwrap();
        assert!(run(&cli).is_err());
        assert_eq!(std::fs::read(input.path()).unwrap(), data);
    }

    #[test]
    fn test_limit_caps_config_and_report() {
        let input = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(input.path(), image_with_power_block(20)).unwrap();

        for mode in ["smart", "naive", "exact-scored"] {
            let argv: Vec<OsString> = vec![
                "atom-scan".into(),
                "-f".into(),
                "json".into(),
                "scan".into(),
                input.path().into(),
                "-m".into(),
                mode.into(),
                "-t".into(),
                "300".into(),
                "--limit".into(),
                "5".into(),
            ];
            let cli = Cli::try_parse_from(argv).unwrap();
            let Command::Scan(args) = cli.command else {
                panic!("expected scan");
            };
            assert_eq!(scan_config(&args).unwrap().smart_result_cap, 5);
            assert_eq!(scan_report(&args).unwrap().candidates.len(), 5, "mode {}", mode);
        }
    }

    #[test]
    fn test_no_limit_keeps_every_candidate() {
        let input = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(input.path(), image_with_power_block(20)).unwrap();

        let argv: Vec<OsString> = vec!["atom-scan".into(), "scan".into(), input.path().into()];
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(scan_report(&args).unwrap().candidates.len(), 20);
    }

    #[test]
    fn test_describe_field_below_legacy_base() {
        let line = describe_field(0x10, FieldWidth::U16, 0x1234, &[0x34, 0x12]);
        assert_eq!(line, "0x10 (rel -0x3FFF0) u16 = 4660 (0x1234) [3412]");

        let line = describe_field(LEGACY_BASE + 0x20, FieldWidth::U8, 7, &[7]);
        assert!(line.starts_with("0x40020 (rel 0x20) u8 = 7"));
    }
}
