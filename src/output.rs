use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use csv;
use ndarray::Array2;
use serde_json;

use corpus::{Corpus, Vocabulary};
use error::Result;
use model::TopicModel;

/// Formats like Java's `Double.toString`: plain decimals in `[1e-3, 1e7)`,
/// `<mantissa>E<exponent>` otherwise, always with a fractional digit.
pub fn format_double(x: f64) -> String {
    let abs = x.abs();
    if x == 0.0 || !x.is_finite() || (abs >= 1e-3 && abs < 1e7) {
        return format!("{:?}", x);
    }
    let sci = format!("{:e}", x);
    let mut parts = sci.splitn(2, 'e');
    let mantissa = parts.next().unwrap_or("");
    let exponent = parts.next().unwrap_or("0");
    if mantissa.contains('.') {
        format!("{}E{}", mantissa, exponent)
    }
    else {
        format!("{}.0E{}", mantissa, exponent)
    }
}

fn topic_labels(num_topics: usize) -> Vec<String> {
    (0..num_topics).map(|k| format!("T{}", k)).collect()
}

// Excel dialect: CRLF line endings.
fn table_writer<W: io::Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer)
}

/// One row per word: the word, then its probability under each topic.
pub fn write_phi<W: io::Write>(mut writer: W, vocabulary: &Vocabulary, phi: &Array2<f64>) -> Result<()> {
    let (num_topics, vocab_size) = phi.dim();

    // The corner cell is written as a quoted empty string, which the csv
    // writer only does for single-field records.
    write!(writer, "\"\"")?;
    for label in topic_labels(num_topics) {
        write!(writer, ",{}", label)?;
    }
    write!(writer, "\r\n")?;
    let mut out = table_writer(writer);

    for v in 0..vocab_size {
        let mut row = Vec::with_capacity(num_topics + 1);
        row.push(vocabulary.word(v).to_owned());
        row.extend((0..num_topics).map(|k| format_double(phi[[k, v]])));
        out.write_record(&row)?;
    }
    out.flush()?;
    Ok(())
}

/// One row per document: its id, then its topic proportions.
pub fn write_theta<W: io::Write>(writer: W, corpus: &Corpus, theta: &Array2<f64>) -> Result<()> {
    let mut out = table_writer(writer);
    let num_topics = theta.dim().1;

    let mut header = vec!["DocId".to_owned()];
    header.extend(topic_labels(num_topics));
    out.write_record(&header)?;

    for (doc, proportions) in corpus.documents.iter().zip(theta.outer_iter()) {
        let mut row = Vec::with_capacity(num_topics + 1);
        row.push(doc.name.clone());
        row.extend(proportions.iter().map(|&p| format_double(p)));
        out.write_record(&row)?;
    }
    out.flush()?;
    Ok(())
}

/// `rows` rows of `word (count) ` cells, one column per topic, most frequent
/// words first. Topics that run out of words leave their cells empty.
pub fn write_prob_words<W: io::Write>(writer: W, vocabulary: &Vocabulary, model: &TopicModel, rows: usize) -> Result<()> {
    let mut out = table_writer(writer);
    let num_topics = model.num_topics();
    out.write_record(&topic_labels(num_topics))?;

    let sorted: Vec<Vec<(usize, usize)>> = (0..num_topics).map(|k| model.sorted_words(k)).collect();
    for r in 0..rows {
        let row: Vec<String> = sorted.iter().map(|words| {
            match words.get(r) {
                Some(&(v, count)) => format!("{} ({}) ", vocabulary.word(v), count),
                None => String::new(),
            }
        }).collect();
        out.write_record(&row)?;
    }
    out.flush()?;
    Ok(())
}

/// Writes `<prefix>-Phi.csv`, `<prefix>-Theta.csv` and `<prefix>-ProbWords.csv`
/// into `dir`, returning their paths.
pub fn write_tables(dir: &Path, prefix: &str, corpus: &Corpus, model: &TopicModel, prob_words: usize) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let phi_path = dir.join(format!("{}-Phi.csv", prefix));
    let theta_path = dir.join(format!("{}-Theta.csv", prefix));
    let words_path = dir.join(format!("{}-ProbWords.csv", prefix));

    write_phi(BufWriter::new(File::create(&phi_path)?), &corpus.vocabulary, &model.phi())?;
    write_theta(BufWriter::new(File::create(&theta_path)?), corpus, &model.theta())?;
    write_prob_words(BufWriter::new(File::create(&words_path)?), &corpus.vocabulary, model, prob_words)?;

    debug!("wrote {}, {} and {}", phi_path.display(), theta_path.display(), words_path.display());
    Ok(vec![phi_path, theta_path, words_path])
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ModelSnapshot {
    pub num_topics: usize,
    pub alpha: Vec<f64>,
    pub beta: f64,
    pub vocabulary: Vec<String>,
    pub documents: Vec<String>,
    pub phi: Array2<f64>,
    pub theta: Array2<f64>,
}

impl ModelSnapshot {
    pub fn new(corpus: &Corpus, model: &TopicModel) -> ModelSnapshot {
        ModelSnapshot {
            num_topics: model.num_topics(),
            alpha: model.alpha().to_vec(),
            beta: model.beta(),
            vocabulary: corpus.vocabulary.words().to_vec(),
            documents: corpus.documents.iter().map(|d| d.name.clone()).collect(),
            phi: model.phi(),
            theta: model.theta(),
        }
    }
}

pub fn write_model<P: AsRef<Path>>(path: P, corpus: &Corpus, model: &TopicModel) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut file, &ModelSnapshot::new(corpus, model))?;
    Ok(())
}
