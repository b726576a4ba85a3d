//! Разбиение выборки, K-Fold и перебор гиперпараметров по сетке

#![allow(non_snake_case)]

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::metrics::r2_score;
use crate::models::{Hyperparameters, ModelError, ModelKind, Regressor};

/// Перемешивает индексы строк и делит их на обучающие и тестовые.
///
/// В обучающую часть попадает `round(train_ratio * n_rows)` строк, обе части непустые.
pub fn train_test_split(
    n_rows: usize,
    train_ratio: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), ModelError> {
    if n_rows < 2 {
        return Err(ModelError::TooFewSamples {
            needed: 2,
            got: n_rows,
        });
    }
    let n_train = (train_ratio * n_rows as f64).round() as usize;
    if n_train == 0 || n_train >= n_rows {
        return Err(ModelError::InvalidParameter {
            name: "train_ratio".to_string(),
            value: train_ratio,
        });
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test = indices.split_off(n_train);
    Ok((indices, test))
}

/// Разбиение на фолды
#[derive(Debug, Clone)]
pub struct Fold {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// K-Fold без перемешивания: последовательные блоки, первые `n % k` блоков на одну строку больше
#[derive(Debug, Clone, Copy)]
pub struct KFold {
    n_splits: usize,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>, ModelError> {
        let k = self.n_splits;
        if k < 2 {
            return Err(ModelError::InvalidParameter {
                name: "n_splits".to_string(),
                value: k as f64,
            });
        }
        if n_samples < k {
            return Err(ModelError::TooFewSamples {
                needed: k,
                got: n_samples,
            });
        }

        let base = n_samples / k;
        let remainder = n_samples % k;

        let mut folds = Vec::with_capacity(k);
        let mut start = 0;
        for i in 0..k {
            let size = if i < remainder { base + 1 } else { base };
            let end = start + size;
            folds.push(Fold {
                train: (0..start).chain(end..n_samples).collect(),
                validation: (start..end).collect(),
            });
            start = end;
        }
        Ok(folds)
    }
}

/// Сетка гиперпараметров: имя -> список значений
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid(BTreeMap<String, Vec<f64>>);

impl ParamGrid {
    pub fn new(grid: BTreeMap<String, Vec<f64>>) -> Self {
        Self(grid)
    }

    /// Декартово произведение значений; ключи перебираются в алфавитном порядке,
    /// последний ключ меняется быстрее всех. Пустая сетка дает одну пустую комбинацию.
    pub fn combinations(&self) -> Vec<Hyperparameters> {
        let mut combos = vec![Hyperparameters::new()];
        for (name, values) in &self.0 {
            let mut next = Vec::with_capacity(combos.len() * values.len());
            for combo in &combos {
                for &value in values {
                    let mut extended = combo.clone();
                    extended.insert(name.clone(), value);
                    next.push(extended);
                }
            }
            combos = next;
        }
        combos
    }

    fn check(&self) -> Result<(), ModelError> {
        match self.0.iter().find(|(_, values)| values.is_empty()) {
            Some((name, _)) => Err(ModelError::EmptyGrid(name.clone())),
            None => Ok(()),
        }
    }
}

impl From<BTreeMap<String, Vec<f64>>> for ParamGrid {
    fn from(grid: BTreeMap<String, Vec<f64>>) -> Self {
        Self(grid)
    }
}

#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub best_params: Hyperparameters,
    pub best_score: f64,
    /// Средний R² на валидации для каждой комбинации, в порядке перебора
    pub cv_scores: Vec<(Hyperparameters, f64)>,
}

/// Перебор по сетке с оценкой среднего R² на K-Fold
#[derive(Debug, Clone, Copy)]
pub struct GridSearch {
    kfold: KFold,
    seed: u64,
}

impl GridSearch {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self {
            kfold: KFold::new(n_splits),
            seed,
        }
    }

    /// Лучшая комбинация - с наибольшим средним R²; при равенстве остается первая.
    /// Любая ошибка обучения прерывает поиск.
    pub fn fit(
        &self,
        kind: ModelKind,
        grid: &ParamGrid,
        X: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<GridSearchResult, ModelError> {
        grid.check()?;
        let folds = self.kfold.split(X.nrows())?;

        let mut cv_scores = Vec::new();
        for params in grid.combinations() {
            let mut total = 0.0;
            for fold in &folds {
                let X_train = X.select(Axis(0), &fold.train);
                let y_train = y.select(Axis(0), &fold.train);
                let X_val = X.select(Axis(0), &fold.validation);
                let y_val = y.select(Axis(0), &fold.validation);

                let mut model = kind.instantiate(&params, self.seed)?;
                model.fit(&X_train, &y_train)?;
                total += r2_score(&y_val, &model.predict(&X_val)?)?;
            }
            let mean = total / folds.len() as f64;
            tracing::debug!(model = kind.name(), ?params, cv_r2 = mean, "Grid point evaluated");
            cv_scores.push((params, mean));
        }

        let mut best: Option<usize> = None;
        for (i, (_, score)) in cv_scores.iter().enumerate() {
            if !score.is_finite() {
                continue;
            }
            if best.map_or(true, |b| *score > cv_scores[b].1) {
                best = Some(i);
            }
        }
        let best = best.unwrap_or(0);
        let (best_params, best_score) = cv_scores[best].clone();

        Ok(GridSearchResult {
            best_params,
            best_score,
            cv_scores,
        })
    }
}
