use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use websift_core::{SearchFilters, SiftError};
use websift_embed::Chunk;

use crate::Storage;

/// One chunk-level hit joined with its page. `score` is `1 - cosine
/// distance`, so higher is more similar.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchHit {
    pub chunk_id: Uuid,
    pub page_id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub domain: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub page_content: Option<String>,
    pub chunk_content: String,
    pub score: f64,
}

const HIT_COLUMNS: &str = "c.id AS chunk_id, p.id AS page_id, p.url, p.title, p.domain, \
                           p.author, p.published_at, p.content AS page_content, \
                           c.content AS chunk_content";

/// How far past `k` the similar-page query reads before deduplicating, so
/// that pages with many strong chunks cannot crowd everything else out.
const SIMILAR_OVERFETCH: usize = 3;

impl Storage {
    /// Atomically replace every chunk of `page_id` with the supplied list.
    /// Chunk indices are assigned densely from 0 in input order. The page
    /// row is locked for the duration, so concurrent re-indexes of the same
    /// page serialize and the loser leaves a consistent chunk set.
    pub async fn upsert_page_chunks(
        &self,
        page_id: Uuid,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(SiftError::Storage(format!(
                "chunk/embedding count mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            ))
            .into());
        }

        let mut tx = self.pool().begin().await?;

        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM pages WHERE id = $1 FOR UPDATE")
            .bind(page_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(SiftError::NotFound(format!("page {page_id}")).into());
        }

        sqlx::query("DELETE FROM chunks WHERE page_id = $1")
            .bind(page_id)
            .execute(&mut *tx)
            .await?;

        for (index, (chunk, embedding)) in chunks.iter().zip(embeddings).enumerate() {
            sqlx::query(
                "INSERT INTO chunks (page_id, chunk_index, content, embedding, start_char, end_char)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(page_id)
            .bind(index as i32)
            .bind(&chunk.content)
            .bind(Vector::from(embedding.clone()))
            .bind(chunk.start_char as i32)
            .bind(chunk.end_char as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(%page_id, chunks = chunks.len(), "replaced page chunks");
        Ok(chunks.len())
    }

    /// Top-`limit` chunks by cosine similarity, one hit per page (its best
    /// chunk wins). Filters restrict by domain, publish date, and language;
    /// an unset filter means no restriction.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {HIT_COLUMNS}, (1 - (c.embedding <=> "));
        qb.push_bind(Vector::from(query_embedding.to_vec()));
        qb.push(
            "))::float8 AS score FROM chunks c JOIN pages p ON p.id = c.page_id \
             WHERE c.embedding IS NOT NULL",
        );

        if let Some(domains) = &filters.domains {
            qb.push(" AND p.domain = ANY(");
            qb.push_bind(domains.clone());
            qb.push(")");
        }
        if let Some(excluded) = &filters.exclude_domains {
            qb.push(" AND p.domain != ALL(");
            qb.push_bind(excluded.clone());
            qb.push(")");
        }
        if let Some(start) = filters.start_date {
            qb.push(" AND p.published_at >= ");
            qb.push_bind(start);
        }
        if let Some(end) = filters.end_date {
            qb.push(" AND p.published_at <= ");
            qb.push_bind(end);
        }
        if let Some(language) = &filters.language {
            qb.push(" AND p.language = ");
            qb.push_bind(language.clone());
        }

        qb.push(" ORDER BY score DESC, c.created_at, c.chunk_index LIMIT ");
        qb.push_bind(limit as i64);

        let hits: Vec<SearchHit> = qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(dedup_by_page(hits, limit))
    }

    /// Pages similar to `page_id`, ranked by cosine similarity against the
    /// source page's first chunk. The source page is always excluded; its
    /// domain optionally too. Returns empty when the page has no indexed
    /// chunks.
    pub async fn find_similar_to_page(
        &self,
        page_id: Uuid,
        limit: usize,
        exclude_same_domain: bool,
    ) -> Result<Vec<SearchHit>> {
        let source: Option<(Option<Vector>, String)> = sqlx::query_as(
            "SELECT c.embedding, p.domain FROM chunks c JOIN pages p ON p.id = c.page_id \
             WHERE c.page_id = $1 ORDER BY c.chunk_index LIMIT 1",
        )
        .bind(page_id)
        .fetch_optional(self.pool())
        .await?;

        let Some((Some(embedding), source_domain)) = source else {
            return Ok(Vec::new());
        };

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {HIT_COLUMNS}, (1 - (c.embedding <=> "));
        qb.push_bind(embedding);
        qb.push(
            "))::float8 AS score FROM chunks c JOIN pages p ON p.id = c.page_id \
             WHERE c.embedding IS NOT NULL AND p.id != ",
        );
        qb.push_bind(page_id);

        if exclude_same_domain {
            qb.push(" AND p.domain != ");
            qb.push_bind(source_domain);
        }

        qb.push(" ORDER BY score DESC, c.created_at, c.chunk_index LIMIT ");
        qb.push_bind((limit * SIMILAR_OVERFETCH) as i64);

        let hits: Vec<SearchHit> = qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(dedup_by_page(hits, limit))
    }
}

/// Keep the first (highest-scoring) hit per page, up to `limit` pages. Input
/// must already be sorted by score descending.
fn dedup_by_page(hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut deduped = Vec::with_capacity(limit.min(hits.len()));

    for hit in hits {
        if deduped.len() >= limit {
            break;
        }
        if seen.insert(hit.page_id) {
            deduped.push(hit);
        }
    }

    deduped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(page: Uuid, score: f64) -> SearchHit {
        SearchHit {
            chunk_id: Uuid::new_v4(),
            page_id: page,
            url: format!("https://a.test/{score}"),
            title: None,
            domain: "a.test".to_string(),
            author: None,
            published_at: None,
            page_content: None,
            chunk_content: "chunk".to_string(),
            score,
        }
    }

    #[test]
    fn dedup_keeps_best_chunk_per_page() {
        let page_a = Uuid::new_v4();
        let page_b = Uuid::new_v4();
        let hits = vec![hit(page_a, 0.9), hit(page_a, 0.7), hit(page_b, 0.6)];

        let deduped = dedup_by_page(hits, 10);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].page_id, page_a);
        assert_eq!(deduped[0].score, 0.9);
        assert_eq!(deduped[1].page_id, page_b);
    }

    #[test]
    fn dedup_respects_limit() {
        let hits: Vec<SearchHit> = (0..5)
            .map(|i| hit(Uuid::new_v4(), 1.0 - i as f64 * 0.1))
            .collect();
        let deduped = dedup_by_page(hits, 3);
        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped[0].score, 1.0);
    }
}
