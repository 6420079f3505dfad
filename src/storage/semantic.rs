//! Vector persistence and similarity search. Vectors ride in the same
//! database as the clips they describe; search is a brute-force cosine scan
//! over a recency-bounded candidate pool.

use rusqlite::{OptionalExtension, params, params_from_iter};

use super::models::{Clip, ClipFilter, ScoredClip};
use super::{Store, clip_columns, row_to_clip};
use crate::embed::ModelKind;
use crate::errors::{Result, VaultError};
use crate::knn::knn;

pub(crate) fn encode_vector(vec: &[f32]) -> String {
    serde_json::to_string(vec).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn decode_vector(raw: &str) -> Vec<f32> {
    serde_json::from_str(raw).unwrap_or_default()
}

impl Store {
    /// Upsert the embedding for a clip, tagged with the model that produced
    /// it. Runs on the caller's connection so it can join an open
    /// transaction.
    pub(crate) fn store_embedding(
        &self,
        clip_id: i64,
        vector: &[f32],
        model: ModelKind,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO clip_vectors(clip_id, dim, vector, model) VALUES (?, ?, ?, ?)
             ON CONFLICT(clip_id) DO UPDATE SET
                 dim=excluded.dim, vector=excluded.vector, model=excluded.model",
            params![clip_id, vector.len() as i64, encode_vector(vector), model.as_str()],
        )?;
        Ok(())
    }

    pub fn embedding_for(&self, clip_id: i64) -> Result<Option<(Vec<f32>, ModelKind)>> {
        let row = self
            .conn()
            .query_row(
                "SELECT vector, model FROM clip_vectors WHERE clip_id = ?",
                params![clip_id],
                |row| {
                    let raw: String = row.get(0)?;
                    let model: String = row.get(1)?;
                    Ok((raw, model))
                },
            )
            .optional()?;
        Ok(row.map(|(raw, model)| (decode_vector(&raw), ModelKind::parse(&model))))
    }

    /// Newest-first candidate pool for a scan: clips that have a vector from
    /// the given model and pass the filter.
    fn fetch_candidates(
        &self,
        filter: &ClipFilter,
        pool: i64,
        model: ModelKind,
    ) -> Result<Vec<(Clip, Vec<f32>)>> {
        let (clauses, extra) = filter.sql_clauses("c.");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(model.as_str().to_string())];
        params.extend(extra);
        let and_sql = clauses
            .iter()
            .map(|c| format!(" AND {c}"))
            .collect::<String>();
        params.push(Box::new(pool));
        let cols = clip_columns("c.");
        let sql = format!(
            "SELECT {cols}, v.vector FROM clips c
             JOIN clip_vectors v ON v.clip_id = c.id
             WHERE v.model = ?{and_sql}
             ORDER BY c.created_at DESC, c.id DESC LIMIT ?"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let clip = row_to_clip(row)?;
                let raw: String = row.get(10)?;
                Ok((clip, raw))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .map(|(clip, raw)| (clip, decode_vector(&raw)))
            .collect())
    }

    /// Embed the query and rank the candidate pool by cosine similarity.
    /// Candidates are restricted to vectors from the model that actually
    /// embedded the query, so scores are never cross-model.
    pub fn semantic_search(
        &self,
        query: &str,
        limit: usize,
        pool: i64,
        filter: &ClipFilter,
        model: Option<ModelKind>,
    ) -> Result<Vec<ScoredClip>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let kind = self.embedder(model)?;
        let (query_vec, used) = self.engine().borrow_mut().embed(query, kind);
        let pool = if pool <= 0 { 2000 } else { pool };
        let candidates = self.fetch_candidates(filter, pool, used)?;
        self.rank(&query_vec, candidates, limit, None)
    }

    /// Clips most similar to an existing clip, excluding the clip itself.
    pub fn related(
        &self,
        clip_id: i64,
        limit: usize,
        pool: i64,
        app: Option<String>,
        tag: Option<String>,
    ) -> Result<Vec<ScoredClip>> {
        let (vector, model) = self.embedding_for(clip_id)?.ok_or_else(|| {
            VaultError::NotFound(format!("clip {clip_id} has no embedding"))
        })?;
        let filter = ClipFilter { app, tag, ..Default::default() };
        let pool = if pool <= 0 { 2000 } else { pool };
        let candidates = self.fetch_candidates(&filter, pool, model)?;
        self.rank(&vector, candidates, limit, Some(clip_id))
    }

    fn rank(
        &self,
        query_vec: &[f32],
        candidates: Vec<(Clip, Vec<f32>)>,
        limit: usize,
        exclude: Option<i64>,
    ) -> Result<Vec<ScoredClip>> {
        let mut clips = Vec::with_capacity(candidates.len());
        let mut ids = Vec::with_capacity(candidates.len());
        let mut vecs = Vec::with_capacity(candidates.len());
        for (clip, vec) in candidates {
            if exclude == Some(clip.id) {
                continue;
            }
            ids.push(clip.id);
            vecs.push(vec);
            clips.push(clip);
        }
        let by_id: std::collections::HashMap<i64, Clip> =
            clips.into_iter().map(|c| (c.id, c)).collect();
        let ranked = knn(query_vec, &ids, &vecs, limit);
        Ok(ranked
            .into_iter()
            .filter_map(|(score, id)| {
                by_id.get(&id).map(|clip| ScoredClip { score, clip: clip.clone() })
            })
            .collect())
    }
}
