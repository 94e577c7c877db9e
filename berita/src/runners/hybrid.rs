use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use super::embed::{build_embedder, write_cluster_charts};
use super::lda::prepare_corpus;
use super::{input_missing, read_text_column};
use crate::cluster::{guide_embeddings, ClusterTopicModel};
use crate::config::Settings;
use crate::embedding::embed_with_fallback;
use crate::error::PipelineError;
use crate::lda::{LdaConfig, LdaModel};
use crate::metrics::TopicScores;
use crate::models::{write_rows, OUTLIER_TOPIC};
use crate::report::{write_hybrid_report, HybridSummary};
use crate::text::{lda_tokens, LdaCleaner};
use crate::viz;

/// Documents with at least this many tokens take part in both models.
const MIN_TOKENS: usize = LdaCleaner::MIN_DOC_TOKENS;

/// Final cluster of one document next to the LDA topic that guided it.
#[derive(Debug, Serialize)]
struct DocumentAssignment<'a> {
    #[serde(rename = "processed_text")]
    text: &'a str,
    #[serde(rename = "Topik_LDA")]
    lda_topic: usize,
    #[serde(rename = "Topik")]
    topic: i64,
}

/// Trains a fixed-K LDA model, then clusters the embeddings with each
/// document's dominant LDA topic folded in as a guide.
pub fn run(settings: &Settings) -> Result<Option<TopicScores>> {
    let input = &settings.paths.preprocessed;
    let out_dir = &settings.paths.hybrid_dir;
    let cfg = &settings.hybrid;
    if input_missing(input) {
        return Ok(None);
    }

    // Phase 1: align texts and token lists on the same documents
    let raw = read_text_column(input, "processed_text")?;
    let total = raw.len();
    let (texts, tokens): (Vec<String>, Vec<Vec<String>>) = raw
        .into_iter()
        .map(|doc| {
            let t = lda_tokens(&doc);
            (doc, t)
        })
        .filter(|(_, t)| t.len() >= MIN_TOKENS)
        .unzip();
    info!(total, valid = texts.len(), "aligned documents");
    if texts.is_empty() {
        return Err(PipelineError::EmptyCorpus { stage: "hybrid" }.into());
    }

    // Phase 2: the guiding LDA model
    let corpus = prepare_corpus(tokens.clone(), cfg.use_bigrams.then_some(cfg.phrases), cfg.no_below, cfg.no_above);
    let lda = LdaModel::train(
        &corpus.bows,
        &corpus.dictionary,
        &LdaConfig {
            num_topics: cfg.num_topics,
            passes: cfg.passes,
            sweeps_per_pass: cfg.sweeps_per_pass,
            alpha: cfg.alpha,
            eta: cfg.eta,
            seed: settings.seed,
        },
    )?;
    let labels: Vec<usize> = corpus.bows.iter().map(|bow| lda.dominant_topic(bow)).collect();
    info!(k = cfg.num_topics, "LDA guide trained");
    debug!(alpha = ?lda.alpha(), eta = lda.eta(), "learned priors");

    // Phase 3: guided clustering
    let embedder = build_embedder(&cfg.embedder)?;
    let (embedder_label, embeddings) = embed_with_fallback(embedder.as_ref(), &texts)?;
    let guided = guide_embeddings(&embeddings, &labels, cfg.guide_weight);
    let model = ClusterTopicModel::fit(&texts, &guided, &cfg.cluster)?;

    let scores = TopicScores::evaluate(model.topics(), &tokens);
    let outliers = model.get_topic(OUTLIER_TOPIC).map_or(0, |t| t.count);
    info!(
        topics = model.num_topics(),
        outliers,
        npmi = scores.npmi,
        cv = scores.cv,
        diversity = scores.diversity,
        "hybrid result"
    );

    // Phase 4: outputs
    write_rows(&out_dir.join("topic_info.csv"), &model.topic_info())?;
    let assignments: Vec<DocumentAssignment> = texts
        .iter()
        .zip(&labels)
        .zip(model.labels())
        .map(|((text, &lda_topic), &topic)| DocumentAssignment { text, lda_topic, topic })
        .collect();
    write_rows(&out_dir.join("document_topics.csv"), &assignments)?;
    write_hybrid_report(
        &out_dir.join("LAPORAN_HYBRID_LDA_BERT.txt"),
        &HybridSummary {
            lda_topics: cfg.num_topics,
            embedder: embedder_label,
            use_bigrams: cfg.use_bigrams,
            documents: texts.len(),
            guide_weight: cfg.guide_weight,
        },
        &scores,
        model.topics(),
    )?;
    let plots = out_dir.join("plots");
    write_cluster_charts(
        &plots,
        "1_barchart_hybrid.json",
        "interactive_hybrid_clusters.html",
        "Peta Topik Hybrid",
        model.topics(),
    )?;
    viz::write_topic_map(
        &plots.join("interactive_hybrid_lda.html"),
        &format!("Peta Topik LDA Pemandu (K={})", cfg.num_topics),
        &lda.show_topics(10),
        &lda.topic_word_matrix(),
        &lda.topic_prevalence(),
    )?;

    println!("📊 Hybrid LDA-guided clustering:");
    println!("   Dokumen: {} dari {} | Topik: {} | Outlier: {}", texts.len(), total, model.num_topics(), outliers);
    println!(
        "   NPMI: {:.4} | Cv: {:.4} | Diversity: {:.4}",
        scores.npmi, scores.cv, scores.diversity
    );
    println!("   Hasil: {}", out_dir.display());
    Ok(Some(scores))
}
