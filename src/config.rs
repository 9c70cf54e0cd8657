use std::path::{Path, PathBuf};

use clap::{App, Arg, ArgMatches};

use corpus::Columns;
use error::{Error, Result};
use model::TrainOptions;
use output::format_double;

pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("csv-lda")
        .version(crate_version!())
        .author("Yuta Taniguchi <yuta.taniguchi.y.t@gmail.com>")
        .about("Trains latent Dirichlet allocation on a CSV corpus")
        .arg(Arg::with_name("topics")
             .short("t")
             .long("topics")
             .takes_value(true)
             .value_name("NUMBER")
             .required(true)
             .help("Set the number of topics"))
        .arg(Arg::with_name("iterations")
             .short("i")
             .long("iterations")
             .takes_value(true)
             .value_name("NUMBER")
             .required(true)
             .help("Set the number of Gibbs sweeps"))
        .arg(Arg::with_name("threads")
             .long("threads")
             .takes_value(true)
             .value_name("NUMBER")
             .default_value("1")
             .help("Set the number of sampling threads"))
        .arg(Arg::with_name("tmp-interval")
             .long("tmp-interval")
             .takes_value(true)
             .value_name("NUMBER")
             .default_value("0")
             .help("Write intermediate tables every NUMBER sweeps"))
        .arg(Arg::with_name("log-interval")
             .long("log-interval")
             .takes_value(true)
             .value_name("NUMBER")
             .default_value("0")
             .help("Log the model log-likelihood every NUMBER sweeps"))
        .arg(Arg::with_name("prob-words")
             .long("prob-words")
             .takes_value(true)
             .value_name("NUMBER")
             .default_value("100")
             .help("Set the number of top words listed per topic"))
        .arg(Arg::with_name("alpha")
             .short("a")
             .long("alpha")
             .takes_value(true)
             .value_name("VALUE")
             .required(true)
             .help("Set the Dirichlet prior of each topic in a document"))
        .arg(Arg::with_name("beta")
             .short("b")
             .long("beta")
             .takes_value(true)
             .value_name("VALUE")
             .required(true)
             .help("Set the Dirichlet prior of each word in a topic"))
        .arg(Arg::with_name("input-dir")
             .short("d")
             .long("input-dir")
             .takes_value(true)
             .value_name("DIR")
             .required(true)
             .help("Set the input directory"))
        .arg(Arg::with_name("output-dir")
             .short("o")
             .long("output-dir")
             .takes_value(true)
             .value_name("DIR")
             .help("Set the output directory (defaults to the input directory)"))
        .arg(Arg::with_name("data")
             .long("data")
             .takes_value(true)
             .value_name("FILE")
             .required(true)
             .help("Set the data file name inside the input directory"))
        .arg(Arg::with_name("stopwords")
             .long("stopwords")
             .takes_value(true)
             .value_name("FILE")
             .help("Specify a whitespace separated stopword list"))
        .arg(Arg::with_name("min-words")
             .long("min-words")
             .takes_value(true)
             .value_name("NUMBER")
             .default_value("1")
             .help("Skip documents with fewer tokens than NUMBER"))
        .arg(Arg::with_name("id-column")
             .long("id-column")
             .takes_value(true)
             .value_name("NAME")
             .default_value("DocId")
             .help("Set the CSV column holding document ids"))
        .arg(Arg::with_name("text-column")
             .long("text-column")
             .takes_value(true)
             .value_name("NAME")
             .default_value("Text")
             .help("Set the CSV column holding document text"))
        .arg(Arg::with_name("optimize-interval")
             .long("optimize-interval")
             .takes_value(true)
             .value_name("NUMBER")
             .default_value("50")
             .help("Re-estimate alpha and beta every NUMBER sweeps (0 disables)"))
        .arg(Arg::with_name("optimize-burn-in")
             .long("optimize-burn-in")
             .takes_value(true)
             .value_name("NUMBER")
             .default_value("200")
             .help("Set the number of sweeps before hyperparameter optimization"))
        .arg(Arg::with_name("seed")
             .long("seed")
             .takes_value(true)
             .value_name("NUMBER")
             .help("Set the random seed"))
        .arg(Arg::with_name("model")
             .long("model")
             .takes_value(true)
             .value_name("MODEL-FILE")
             .help("Also write the trained model as JSON"))
}

#[derive(Debug, Clone)]
pub struct Config {
    pub num_topics: usize,
    pub iterations: usize,
    pub threads: usize,
    pub tmp_interval: usize,
    pub log_interval: usize,
    pub prob_words: usize,
    pub alpha: f64,
    pub beta: f64,
    pub input_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub data: String,
    pub stopwords: Option<PathBuf>,
    pub min_words: usize,
    pub columns: Columns,
    pub optimize_interval: usize,
    pub optimize_burn_in: usize,
    pub seed: Option<usize>,
    pub model_file: Option<PathBuf>,
}

macro_rules! value {
    ($m:ident, $name:expr, $t:ty) => {
        value_t!($m, $name, $t).map_err(|e| Error::invalid_argument($name, e.message))
    };
}

fn positive(name: &'static str, value: f64) -> Result<f64> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    }
    else {
        Err(Error::invalid_argument(name, format!("must be a positive number, got {}", value)))
    }
}

fn at_least_one(name: &'static str, value: usize) -> Result<usize> {
    if value >= 1 {
        Ok(value)
    }
    else {
        Err(Error::invalid_argument(name, "must be at least 1"))
    }
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Result<Config> {
        let mut columns = Columns::default();
        if let Some(id) = matches.value_of("id-column") {
            columns.id = id.to_owned();
        }
        if let Some(text) = matches.value_of("text-column") {
            columns.text = text.to_owned();
        }
        let seed = if matches.is_present("seed") {
            Some(value!(matches, "seed", usize)?)
        }
        else {
            None
        };
        Ok(Config {
            num_topics: at_least_one("topics", value!(matches, "topics", usize)?)?,
            iterations: value!(matches, "iterations", usize)?,
            threads: at_least_one("threads", value!(matches, "threads", usize)?)?,
            tmp_interval: value!(matches, "tmp-interval", usize)?,
            log_interval: value!(matches, "log-interval", usize)?,
            prob_words: value!(matches, "prob-words", usize)?,
            alpha: positive("alpha", value!(matches, "alpha", f64)?)?,
            beta: positive("beta", value!(matches, "beta", f64)?)?,
            input_dir: PathBuf::from(matches.value_of("input-dir").unwrap_or(".")),
            output_dir: matches.value_of("output-dir").map(PathBuf::from),
            data: matches.value_of("data").unwrap_or_default().to_owned(),
            stopwords: matches.value_of("stopwords").map(PathBuf::from),
            min_words: value!(matches, "min-words", usize)?,
            columns: columns,
            optimize_interval: value!(matches, "optimize-interval", usize)?,
            optimize_burn_in: value!(matches, "optimize-burn-in", usize)?,
            seed: seed,
            model_file: matches.value_of("model").map(PathBuf::from),
        })
    }

    pub fn data_path(&self) -> PathBuf {
        self.input_dir.join(&self.data)
    }

    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_ref().unwrap_or(&self.input_dir)
    }

    /// `LDA-<data>-T<topics>-A<alpha>-B<beta>-I<iterations>`
    pub fn output_prefix(&self, iterations: usize) -> String {
        format!("LDA-{}-T{}-A{}-B{}-I{}",
                self.data, self.num_topics, format_double(self.alpha), format_double(self.beta), iterations)
    }

    /// Whether intermediate tables are due after `sweep`; the last sweep only
    /// gets the final tables.
    pub fn writes_intermediate_tables(&self, sweep: usize) -> bool {
        self.tmp_interval > 0 && sweep % self.tmp_interval == 0 && sweep < self.iterations
    }

    pub fn train_options(&self) -> TrainOptions {
        let mut options = TrainOptions::new(self.num_topics, self.alpha, self.beta);
        options.threads = self.threads;
        options.log_interval = self.log_interval;
        options.optimize_interval = self.optimize_interval;
        options.optimize_burn_in = self.optimize_burn_in;
        options.seed = self.seed;
        options
    }
}
