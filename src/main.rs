#[macro_use]
extern crate clap;
extern crate csv;
extern crate env_logger;
#[macro_use]
extern crate log;
extern crate ndarray;
extern crate rand;
extern crate rayon;
extern crate regex;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate thiserror;

#[cfg(test)]
extern crate tempfile;

mod config;
mod corpus;
mod error;
mod math;
mod model;
mod output;

use std::collections::HashSet;
use std::process;

use clap::ArgMatches;

use config::Config;
use corpus::{Corpus, Pipeline};
use error::Result;
use model::TopicModel;

fn run(matches: &ArgMatches) -> Result<()> {
    let config = Config::from_matches(matches)?;

    let stopwords = match config.stopwords {
        Some(ref path) => corpus::load_stopwords(path)?,
        None => HashSet::new(),
    };
    let pipeline = Pipeline::new(stopwords)?;

    eprintln!("Loading training data...");
    let corpus = Corpus::load(config.data_path(), &pipeline, &config.columns, config.min_words)?;
    info!("loaded {} documents ({} skipped), {} tokens, {} distinct words",
          corpus.documents.len(), corpus.skipped, corpus.num_tokens(), corpus.vocabulary.len());

    let out_dir = config.output_dir().to_path_buf();
    let mut model = TopicModel::new(&corpus, config.train_options())?;
    model.estimate(config.iterations, |s, model| {
        if config.writes_intermediate_tables(s) {
            output::write_tables(&out_dir, &config.output_prefix(s), &corpus, model, config.prob_words)?;
        }
        Ok(())
    })?;
    if let Some(&(s, ll)) = model.log_likelihood_trace().last() {
        debug!("final log-likelihood {} at sweep {}", ll, s);
    }

    let paths = output::write_tables(&out_dir, &config.output_prefix(config.iterations),
                                     &corpus, &model, config.prob_words)?;
    for path in &paths {
        info!("wrote {}", path.display());
    }

    if let Some(ref fp) = config.model_file {
        output::write_model(fp, &corpus, &model)?;
        info!("wrote {}", fp.display());
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = config::app().get_matches();
    if let Err(e) = run(&matches) {
        error!("{}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::path::Path;
    use output::ModelSnapshot;
    use tempfile::tempdir;

    const DATA: &str = "DocId,Text\r\n\
                        d1,apple banana apple cherry\r\n\
                        d2,banana banana durian\r\n\
                        d3,\"cherry, apple; durian\"\r\n\
                        d4,???\r\n\
                        d5,durian elderberry banana\r\n";

    fn run_with(args: &[&str]) -> Result<()> {
        let args: Vec<&str> = ["csv-lda"].iter().chain(args).cloned().collect();
        let matches = config::app().get_matches_from_safe(args)
            .map_err(|e| error::Error::invalid_argument("args", e.message))?;
        run(&matches)
    }

    fn table_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir).unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("LDA-"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn run_writes_intermediate_and_final_tables_next_to_the_data() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("c.csv"), DATA).unwrap();
        let input = dir.path().to_str().unwrap();
        let model_path = dir.path().join("model.json");

        run_with(&["-t", "2", "-i", "5", "-a", "0.1", "-b", "0.01", "-d", input, "--data", "c.csv",
                   "--tmp-interval", "2", "--log-interval", "1", "--optimize-interval", "1",
                   "--optimize-burn-in", "2", "--seed", "1",
                   "--model", model_path.to_str().unwrap()]).unwrap();

        let mut expected = Vec::new();
        for i in &[2, 4, 5] {
            for table in &["Phi", "ProbWords", "Theta"] {
                expected.push(format!("LDA-c.csv-T2-A0.1-B0.01-I{}-{}.csv", i, table));
            }
        }
        expected.sort();
        assert_eq!(table_names(dir.path()), expected);

        let theta = fs::read_to_string(dir.path().join("LDA-c.csv-T2-A0.1-B0.01-I5-Theta.csv")).unwrap();
        let ids: Vec<&str> = theta.split("\r\n").skip(1)
            .filter(|l| !l.is_empty())
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(ids, vec!["d1", "d2", "d3", "d5"]);

        let snapshot: ModelSnapshot = serde_json::from_reader(File::open(&model_path).unwrap()).unwrap();
        assert_eq!(snapshot.num_topics, 2);
        assert_eq!(snapshot.documents, vec!["d1", "d2", "d3", "d5"]);
        assert_eq!(snapshot.vocabulary.len(), 5);
        assert!(snapshot.alpha.iter().all(|&a| a.is_finite() && a > 0.0));
    }

    #[test]
    fn run_honours_an_explicit_output_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("c.csv"), DATA).unwrap();
        let out = dir.path().join("out").join("nested");

        run_with(&["-t", "3", "-i", "3", "-a", "0.5", "-b", "0.1",
                   "-d", dir.path().to_str().unwrap(), "--data", "c.csv",
                   "-o", out.to_str().unwrap(), "--threads", "2", "--seed", "7"]).unwrap();

        assert!(table_names(dir.path()).is_empty());
        assert_eq!(table_names(&out), vec!["LDA-c.csv-T3-A0.5-B0.1-I3-Phi.csv",
                                           "LDA-c.csv-T3-A0.5-B0.1-I3-ProbWords.csv",
                                           "LDA-c.csv-T3-A0.5-B0.1-I3-Theta.csv"]);
        assert!(!dir.path().join("model.json").exists());
    }

    #[test]
    fn run_reports_missing_data_file() {
        let dir = tempdir().unwrap();
        match run_with(&["-t", "2", "-i", "1", "-a", "0.1", "-b", "0.1",
                         "-d", dir.path().to_str().unwrap(), "--data", "absent.csv"]) {
            Err(error::Error::Io(_)) => {},
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
