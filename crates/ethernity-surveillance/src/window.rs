/*!
 * Ethernity Surveillance - Window
 *
 * Janelas deslizantes sobre sequências ordenadas no tempo e seleção
 * da janela mais forte.
 */

use ethernity_core::utils::within_window;
use ethernity_core::{Timestamp, Timestamped};
use std::ops::RangeInclusive;

/// Janela contígua de índices inclusivos sobre uma sequência ordenada
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn range(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.range()]
    }
}

/// Para cada índice inicial, a maior janela que cabe em `window_secs`.
///
/// `sorted` precisa estar em ordem cronológica.
pub fn sliding_windows<T: Timestamped>(sorted: &[T], window_secs: u64) -> Vec<Window> {
    let mut windows = Vec::with_capacity(sorted.len());
    let mut end = 0;
    for start in 0..sorted.len() {
        if end < start {
            end = start;
        }
        let opened_at = sorted[start].timestamp();
        while end + 1 < sorted.len() && within_window(opened_at, sorted[end + 1].timestamp(), window_secs) {
            end += 1;
        }
        windows.push(Window { start, end });
    }
    windows
}

/// Acumulador que guarda o candidato de maior contagem.
///
/// Empates ficam com o candidato que começou mais cedo; empates
/// completos ficam com o primeiro oferecido.
#[derive(Debug)]
pub struct Strongest<R> {
    best: Option<(f64, Timestamp, R)>,
}

impl<R> Default for Strongest<R> {
    fn default() -> Self {
        Self { best: None }
    }
}

impl<R> Strongest<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&mut self, tally: f64, started_at: Timestamp, candidate: R) {
        if tally.is_nan() {
            return;
        }
        let replace = match &self.best {
            None => true,
            Some((best_tally, best_start, _)) => {
                tally > *best_tally || (tally == *best_tally && started_at < *best_start)
            }
        };
        if replace {
            self.best = Some((tally, started_at, candidate));
        }
    }

    pub fn tally(&self) -> Option<f64> {
        self.best.as_ref().map(|(tally, _, _)| *tally)
    }

    pub fn into_inner(self) -> Option<R> {
        self.best.map(|(_, _, candidate)| candidate)
    }
}
