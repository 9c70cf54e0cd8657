use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use csv;
use regex::Regex;

use error::{Error, Result};

/// Alphanumeric runs that contain at least one letter.
pub const TOKEN_PATTERN: &str = "[a-z0-9]*[a-z]+[a-z0-9]*";

/// Maps words to dense ids in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    words: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn new() -> Vocabulary {
        Vocabulary::default()
    }

    pub fn lookup_or_insert(&mut self, word: &str) -> usize {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = self.words.len();
        self.words.push(word.to_owned());
        self.ids.insert(word.to_owned(), id);
        id
    }

    pub fn word(&self, id: usize) -> &str {
        &self.words[id]
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub tokens: Vec<usize>,
}

/// Lowercases, tokenizes and drops stopwords.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pattern: Regex,
    stopwords: HashSet<String>,
}

impl Pipeline {
    pub fn new(stopwords: HashSet<String>) -> Result<Pipeline> {
        Ok(Pipeline {
            pattern: Regex::new(TOKEN_PATTERN)?,
            stopwords: stopwords,
        })
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        self.pattern
            .find_iter(&text)
            .map(|m| m.as_str())
            .filter(|token| !self.stopwords.contains(*token))
            .map(|token| token.to_owned())
            .collect()
    }
}

/// Reads a whitespace separated stopword list.
pub fn load_stopwords<P: AsRef<Path>>(path: P) -> Result<HashSet<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content.split_whitespace().map(|w| w.to_lowercase()).collect())
}

/// Which CSV columns hold the document id and its text.
#[derive(Debug, Clone)]
pub struct Columns {
    pub id: String,
    pub text: String,
}

impl Default for Columns {
    fn default() -> Columns {
        Columns {
            id: "DocId".to_owned(),
            text: "Text".to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Corpus {
    pub documents: Vec<Document>,
    pub vocabulary: Vocabulary,
    /// Records dropped for having fewer than `min_words` tokens.
    pub skipped: usize,
}

impl Corpus {
    pub fn load<P: AsRef<Path>>(path: P, pipeline: &Pipeline, columns: &Columns, min_words: usize) -> Result<Corpus> {
        let file = BufReader::new(File::open(path)?);
        Corpus::from_reader(file, pipeline, columns, min_words)
    }

    pub fn from_reader<R: io::Read>(reader: R, pipeline: &Pipeline, columns: &Columns, min_words: usize) -> Result<Corpus> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        let (id_col, text_col) = {
            let headers = reader.headers()?;
            let find = |name: &str| {
                headers.iter()
                    .position(|h| h == name)
                    .ok_or_else(|| Error::MissingColumn(name.to_owned()))
            };
            (find(&columns.id)?, find(&columns.text)?)
        };

        let mut documents = Vec::new();
        let mut vocabulary = Vocabulary::new();
        let mut skipped = 0;
        let mut cnt = 0;
        for record in reader.records() {
            let record = record?;
            let name = record.get(id_col).unwrap_or("");
            let tokens = pipeline.tokenize(record.get(text_col).unwrap_or(""));
            if tokens.len() < min_words {
                debug!("skipping document {:?} with {} tokens", name, tokens.len());
                skipped += 1;
            }
            else {
                let tokens = tokens.iter()
                    .map(|t| vocabulary.lookup_or_insert(t))
                    .collect();
                documents.push(Document {
                    name: name.to_owned(),
                    tokens: tokens,
                });
            }

            cnt += 1;
            if cnt % 1000 == 0 { eprint!("."); }
            if cnt % 10000 == 0 { eprint!("({})", cnt); }
            if cnt % 100000 == 0 { eprintln!(); }
        }
        if cnt >= 1000 {
            eprintln!();
        }

        if documents.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        Ok(Corpus {
            documents: documents,
            vocabulary: vocabulary,
            skipped: skipped,
        })
    }

    pub fn num_tokens(&self) -> usize {
        self.documents.iter().map(|d| d.tokens.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn pipeline() -> Pipeline {
        Pipeline::new(HashSet::new()).unwrap()
    }

    #[test]
    fn tokenize_lowercases_and_requires_a_letter() {
        let tokens = pipeline().tokenize("Hello, World! 2017 was b2b-ish; x86_64 42nd");
        assert_eq!(tokens, vec!["hello", "world", "was", "b2b", "ish", "x86", "42nd"]);
    }

    #[test]
    fn tokenize_drops_stopwords() {
        let stopwords = ["the", "of"].iter().map(|s| s.to_string()).collect();
        let pipeline = Pipeline::new(stopwords).unwrap();
        assert_eq!(pipeline.tokenize("The Theory of the Leisure Class"),
                   vec!["theory", "leisure", "class"]);
    }

    #[test]
    fn vocabulary_assigns_ids_in_order_of_appearance() {
        let mut vocab = Vocabulary::new();
        assert_eq!(vocab.lookup_or_insert("b"), 0);
        assert_eq!(vocab.lookup_or_insert("a"), 1);
        assert_eq!(vocab.lookup_or_insert("b"), 0);
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.word(1), "a");
    }

    #[test]
    fn loads_documents_by_column_name() {
        let data = "Text,DocId\n\"apple banana, apple\",d1\ncherry,d2\n";
        let corpus = Corpus::from_reader(data.as_bytes(), &pipeline(), &Columns::default(), 1).unwrap();
        assert_eq!(corpus.documents.len(), 2);
        assert_eq!(corpus.documents[0], Document { name: "d1".into(), tokens: vec![0, 1, 0] });
        assert_eq!(corpus.documents[1], Document { name: "d2".into(), tokens: vec![2] });
        assert_eq!(corpus.vocabulary.words(), &["apple", "banana", "cherry"]);
        assert_eq!(corpus.num_tokens(), 4);
    }

    #[test]
    fn skips_short_documents_without_growing_vocabulary() {
        let data = "DocId,Text\na,one two three\nb,four\nc,!!!\n";
        let corpus = Corpus::from_reader(data.as_bytes(), &pipeline(), &Columns::default(), 2).unwrap();
        assert_eq!(corpus.documents.len(), 1);
        assert_eq!(corpus.skipped, 2);
        assert!(!corpus.vocabulary.words().contains(&"four".to_owned()));
    }

    #[test]
    fn missing_column_is_reported() {
        let data = "Id,Body\n1,text\n";
        match Corpus::from_reader(data.as_bytes(), &pipeline(), &Columns::default(), 1) {
            Err(Error::MissingColumn(name)) => assert_eq!(name, "DocId"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn empty_corpus_is_an_error() {
        let data = "DocId,Text\n1,123\n";
        match Corpus::from_reader(data.as_bytes(), &pipeline(), &Columns::default(), 1) {
            Err(Error::EmptyCorpus) => {},
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn stopwords_file_is_whitespace_separated() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "a An\nthe\t of\n").unwrap();
        let stopwords = load_stopwords(file.path()).unwrap();
        assert_eq!(stopwords.len(), 4);
        assert!(stopwords.contains("an"));
        assert!(stopwords.contains("of"));
    }
}
