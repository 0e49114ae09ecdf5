//! Command-line interface definitions.
//!
//! One binary covers both halves of the pipeline: `fetch` runs the batch jobs
//! that write the per-category snapshot files, and `query` / `options` /
//! `stats` run the aggregation engine over those files and print JSON.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Horus compliance news pipeline.
///
/// # Examples
///
/// ```sh
/// # Fetch all four category snapshots into ./data
/// horus_compliance_news fetch --all
///
/// # Fetch one category
/// horus_compliance_news fetch --category china-sanctions
///
/// # Query the merged view
/// horus_compliance_news query --industry 芯片 --search "出口管制"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch snapshots from the Feishu bitable tables
    Fetch {
        /// Category slug: china-sanctions, foreign-sanctions, foreign-media,
        /// or data-compliance
        #[arg(short, long, conflicts_with = "all")]
        category: Option<String>,

        /// Fetch all four categories
        #[arg(long)]
        all: bool,

        /// Directory where snapshot JSON files are written
        #[arg(short, long, default_value = "./data")]
        data_dir: String,

        /// Feishu app id for the tenant-access-token exchange
        #[arg(long, env = "FEISHU_APP_ID")]
        app_id: String,

        /// Feishu app secret for the tenant-access-token exchange
        #[arg(long, env = "FEISHU_APP_SECRET")]
        app_secret: String,
    },

    /// Print the merged, filtered news list as JSON
    Query {
        /// Directory holding the snapshot JSON files
        #[arg(short, long, default_value = "./data")]
        data_dir: String,

        /// Category label, or 全部资讯 for no restriction
        #[arg(long)]
        category: Option<String>,

        /// Exact publisher name
        #[arg(long)]
        publisher: Option<String>,

        /// Exact field tag (e.g. 出口管制)
        #[arg(long)]
        field: Option<String>,

        /// Industry value; matches items whose industry list contains it
        #[arg(long)]
        industry: Option<String>,

        /// Case-insensitive substring match over title and content
        #[arg(long)]
        search: Option<String>,
    },

    /// Print the selectable filter values as JSON
    Options {
        /// Directory holding the snapshot JSON files
        #[arg(short, long, default_value = "./data")]
        data_dir: String,
    },

    /// Print aggregate counts as JSON
    Stats {
        /// Directory holding the snapshot JSON files
        #[arg(short, long, default_value = "./data")]
        data_dir: String,
    },
}
