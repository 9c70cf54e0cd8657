use ndarray::Array2;
use rand::{self, Rng, SeedableRng, StdRng};
use rand::distributions::{IndependentSample, Range};
use rayon::{ThreadPool, ThreadPoolBuilder};
use rayon::prelude::*;

use corpus::Corpus;
use error::{Error, Result};
use math::{digamma, ln_gamma, sample_index};

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub num_topics: usize,
    /// Prior weight of each topic in a document.
    pub alpha: f64,
    pub beta: f64,
    pub threads: usize,
    pub log_interval: usize,
    pub optimize_interval: usize,
    pub optimize_burn_in: usize,
    pub seed: Option<usize>,
}

impl TrainOptions {
    pub fn new(num_topics: usize, alpha: f64, beta: f64) -> TrainOptions {
        TrainOptions {
            num_topics: num_topics,
            alpha: alpha,
            beta: beta,
            threads: 1,
            log_interval: 0,
            optimize_interval: 50,
            optimize_burn_in: 200,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
struct DocState {
    words: Vec<usize>,
    topics: Vec<usize>,
    // n_dk
    ndk: Vec<usize>,
}

/// Word-topic counts shared by every document.
#[derive(Debug, Clone, PartialEq)]
struct Counts {
    // n_vk, word-major so that one token's topic weights are contiguous
    nvk: Vec<Vec<usize>>,
    // n_k
    nk: Vec<usize>,
}

impl Counts {
    fn tally(docs: &[DocState], num_topics: usize, vocab_size: usize) -> Counts {
        let mut nvk = vec![vec![0; num_topics]; vocab_size];
        let mut nk = vec![0; num_topics];
        for doc in docs {
            for (&v, &k) in doc.words.iter().zip(&doc.topics) {
                nvk[v][k] += 1;
                nk[k] += 1;
            }
        }
        Counts { nvk: nvk, nk: nk }
    }
}

/// Resamples the topic of every token in `docs` against `counts`.
fn sweep_shard<R: Rng>(docs: &mut [DocState], counts: &mut Counts, alpha: &[f64], beta: f64, rng: &mut R) {
    let num_topics = alpha.len();
    let beta_sum = beta * counts.nvk.len() as f64;
    let mut weights = vec![0.0; num_topics];
    for doc in docs.iter_mut() {
        for i in 0..doc.words.len() {
            let v = doc.words[i];
            let old_k = doc.topics[i];
            doc.ndk[old_k] -= 1;
            counts.nvk[v][old_k] -= 1;
            counts.nk[old_k] -= 1;

            let mut total = 0.0;
            {
                let n_v = &counts.nvk[v];
                for k in 0..num_topics {
                    let w = (doc.ndk[k] as f64 + alpha[k])
                        * (n_v[k] as f64 + beta) / (counts.nk[k] as f64 + beta_sum);
                    weights[k] = w;
                    total += w;
                }
            }
            let new_k = sample_index(&weights, total, rng);

            doc.topics[i] = new_k;
            doc.ndk[new_k] += 1;
            counts.nvk[v][new_k] += 1;
            counts.nk[new_k] += 1;
        }
    }
}

fn seeded_rng(seed: usize) -> StdRng {
    let seed: &[usize] = &[seed];
    StdRng::from_seed(seed)
}

/// LDA trained by collapsed Gibbs sampling.
///
/// With more than one thread, a sweep follows approximate distributed LDA:
/// documents are split into contiguous shards, each shard is sampled against
/// its own copy of the word-topic counts, and the global counts are rebuilt
/// from the assignments afterwards.
pub struct TopicModel {
    options: TrainOptions,
    vocab_size: usize,
    num_tokens: usize,
    alpha: Vec<f64>,
    beta: f64,
    docs: Vec<DocState>,
    counts: Counts,
    rng: StdRng,
    pool: Option<ThreadPool>,
    // (sweep, log-likelihood) at every log interval
    diagnostics: Vec<(usize, f64)>,
}

impl TopicModel {
    pub fn new(corpus: &Corpus, options: TrainOptions) -> Result<TopicModel> {
        if options.num_topics == 0 {
            return Err(Error::invalid_argument("topics", "must be at least 1"));
        }
        if options.threads == 0 {
            return Err(Error::invalid_argument("threads", "must be at least 1"));
        }
        let num_tokens = corpus.num_tokens();
        if num_tokens == 0 {
            return Err(Error::EmptyCorpus);
        }

        let num_topics = options.num_topics;
        let vocab_size = corpus.vocabulary.len();
        let seed = options.seed.unwrap_or_else(rand::random);
        info!("K = {}, M = {}, V = {}, N = {}, seed = {}",
              num_topics, corpus.documents.len(), vocab_size, num_tokens, seed);

        let mut rng = seeded_rng(seed);
        let among_topics = Range::new(0, num_topics);
        let docs: Vec<DocState> = corpus.documents.iter().map(|d| {
            let topics: Vec<usize> = d.tokens.iter()
                .map(|_| among_topics.ind_sample(&mut rng))
                .collect();
            let mut ndk = vec![0; num_topics];
            for &k in &topics {
                ndk[k] += 1;
            }
            DocState {
                words: d.tokens.clone(),
                topics: topics,
                ndk: ndk,
            }
        }).collect();
        let counts = Counts::tally(&docs, num_topics, vocab_size);

        let pool = if options.threads > 1 {
            Some(ThreadPoolBuilder::new().num_threads(options.threads).build()?)
        }
        else {
            None
        };

        Ok(TopicModel {
            alpha: vec![options.alpha; num_topics],
            beta: options.beta,
            options: options,
            vocab_size: vocab_size,
            num_tokens: num_tokens,
            docs: docs,
            counts: counts,
            rng: rng,
            pool: pool,
            diagnostics: Vec::new(),
        })
    }

    pub fn num_topics(&self) -> usize {
        self.alpha.len()
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn log_likelihood_trace(&self) -> &[(usize, f64)] {
        &self.diagnostics
    }

    /// Runs `iterations` sweeps, calling `checkpoint` with the 1-based sweep
    /// number after each one.
    pub fn estimate<F>(&mut self, iterations: usize, mut checkpoint: F) -> Result<()>
        where F: FnMut(usize, &TopicModel) -> Result<()>
    {
        let log_interval = self.options.log_interval;
        let optimize_interval = self.options.optimize_interval;
        let optimize_burn_in = self.options.optimize_burn_in;

        eprint!("Sampling...");
        for s in 1..(iterations + 1) {
            self.sweep();

            if log_interval > 0 && s % log_interval == 0 {
                let ll = self.log_likelihood();
                self.diagnostics.push((s, ll));
                eprintln!();
                info!("<{}> LL/token: {:.5}", s, ll / self.num_tokens as f64);
            }
            if optimize_interval > 0 && s > optimize_burn_in && s % optimize_interval == 0 {
                self.optimize_hyperparameters();
                debug!("<{}> alpha = {:?}, beta = {}", s, self.alpha, self.beta);
            }
            eprint!("\rSampling... {}/{}", s, iterations);
            checkpoint(s, &*self)?;
        }
        eprintln!("\rSampled.");
        Ok(())
    }

    fn sweep(&mut self) {
        let num_topics = self.num_topics();
        let vocab_size = self.vocab_size;
        let alpha = &self.alpha[..];
        let beta = self.beta;
        match self.pool {
            None => {
                sweep_shard(&mut self.docs, &mut self.counts, alpha, beta, &mut self.rng);
            },
            Some(ref pool) => {
                let threads = self.options.threads;
                let shard_size = (self.docs.len() + threads - 1) / threads;
                let num_shards = (self.docs.len() + shard_size - 1) / shard_size;
                let master = &mut self.rng;
                let mut rngs: Vec<StdRng> = (0..num_shards)
                    .map(|_| seeded_rng(master.gen()))
                    .collect();
                let counts = &self.counts;
                let docs = &mut self.docs;
                pool.install(|| {
                    docs.par_chunks_mut(shard_size)
                        .zip(rngs.par_iter_mut())
                        .for_each(|(shard, rng)| {
                            let mut local = counts.clone();
                            sweep_shard(shard, &mut local, alpha, beta, rng);
                        });
                });
                self.counts = Counts::tally(&self.docs, num_topics, vocab_size);
            },
        }
    }

    /// Log joint probability of the words and the current topic assignments.
    pub fn log_likelihood(&self) -> f64 {
        let num_topics = self.num_topics();
        let alpha_sum: f64 = self.alpha.iter().sum();
        let beta = self.beta;
        let beta_sum = beta * self.vocab_size as f64;

        let mut ll = 0.0;
        let topic_log_gammas: Vec<f64> = self.alpha.iter().map(|&a| ln_gamma(a)).collect();
        for doc in &self.docs {
            for (k, &n) in doc.ndk.iter().enumerate() {
                if n > 0 {
                    ll += ln_gamma(self.alpha[k] + n as f64) - topic_log_gammas[k];
                }
            }
            ll -= ln_gamma(alpha_sum + doc.words.len() as f64);
        }
        ll += self.docs.len() as f64 * ln_gamma(alpha_sum);

        let mut non_zero = 0;
        for n_v in &self.counts.nvk {
            for &n in n_v.iter().filter(|&&n| n > 0) {
                non_zero += 1;
                ll += ln_gamma(beta + n as f64);
            }
        }
        for &n in &self.counts.nk {
            ll -= ln_gamma(beta_sum + n as f64);
        }
        ll += num_topics as f64 * ln_gamma(beta_sum);
        ll -= non_zero as f64 * ln_gamma(beta);
        ll
    }

    /// Fixed-point updates of the per-topic alpha and the symmetric beta.
    pub fn optimize_hyperparameters(&mut self) {
        let num_docs = self.docs.len() as f64;
        let num_topics = self.num_topics();
        let vocab_size = self.vocab_size as f64;
        let alpha_sum: f64 = self.alpha.iter().sum();

        let mut y = -num_docs * digamma(alpha_sum);
        for doc in &self.docs {
            y += digamma(doc.words.len() as f64 + alpha_sum);
        }
        for k in 0..num_topics {
            let a = self.alpha[k];
            let mut x = -num_docs * digamma(a);
            for doc in &self.docs {
                x += digamma(doc.ndk[k] as f64 + a);
            }
            let updated = a * x / y;
            if updated.is_finite() && updated > 0.0 {
                self.alpha[k] = updated;
            }
        }

        let beta = self.beta;
        let beta_sum = beta * vocab_size;
        let mut x = -(num_topics as f64) * vocab_size * digamma(beta);
        for n_v in &self.counts.nvk {
            for &n in n_v {
                x += digamma(n as f64 + beta);
            }
        }
        let mut y = -(num_topics as f64) * digamma(beta_sum);
        for &n in &self.counts.nk {
            y += digamma(n as f64 + beta_sum);
        }
        let updated = beta * x / (vocab_size * y);
        if updated.is_finite() && updated > 0.0 {
            self.beta = updated;
        }
    }

    // phi: KxV matrix, smoothed with the beta given at construction even
    // after optimization
    pub fn phi(&self) -> Array2<f64> {
        let num_topics = self.num_topics();
        let beta = self.options.beta;
        let beta_sum = beta * self.vocab_size as f64;
        let mut phi = Array2::zeros((num_topics, self.vocab_size));
        for (v, n_v) in self.counts.nvk.iter().enumerate() {
            for k in 0..num_topics {
                phi[[k, v]] = (n_v[k] as f64 + beta) / (self.counts.nk[k] as f64 + beta_sum);
            }
        }
        phi
    }

    // theta: MxK matrix
    pub fn theta(&self) -> Array2<f64> {
        let num_topics = self.num_topics();
        let alpha_sum: f64 = self.alpha.iter().sum();
        let mut theta = Array2::zeros((self.docs.len(), num_topics));
        for (d, doc) in self.docs.iter().enumerate() {
            let denom = doc.words.len() as f64 + alpha_sum;
            for k in 0..num_topics {
                theta[[d, k]] = (doc.ndk[k] as f64 + self.alpha[k]) / denom;
            }
        }
        theta
    }

    /// `(word, count)` pairs of a topic with a positive count, most frequent
    /// first and ties broken by word id.
    pub fn sorted_words(&self, topic: usize) -> Vec<(usize, usize)> {
        let mut words: Vec<(usize, usize)> = self.counts.nvk.iter()
            .enumerate()
            .map(|(v, n_v)| (v, n_v[topic]))
            .filter(|&(_, n)| n > 0)
            .collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        words
    }
}
