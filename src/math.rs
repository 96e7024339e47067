/// Mean and population standard deviation over a stream of values.
pub trait IteratorAvg: Iterator<Item = f64> {
    fn avg(self) -> Option<f64>;
    fn avg_with_std(self) -> Option<(f64, f64)>;
    fn std(self) -> Option<f64>;
}

impl<I> IteratorAvg for I
where
    I: Iterator<Item = f64>,
{
    fn avg(self) -> Option<f64> {
        let (sum, count) = self.fold((0.0, 0usize), |(sum, count), x| (sum + x, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    fn avg_with_std(self) -> Option<(f64, f64)> {
        let values = self.collect::<Vec<_>>();
        let avg = values.iter().copied().avg()?;
        values
            .into_iter()
            .map(|x| (x - avg).powi(2))
            .avg()
            .map(|var| (avg, var.sqrt()))
    }

    fn std(self) -> Option<f64> {
        self.avg_with_std().map(|(_, std)| std)
    }
}
