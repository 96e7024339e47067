use anyhow::Result;
use colorgrad::Gradient;
use plotters::{prelude::*, style::BLACK};

pub fn filled_style<C: Into<RGBAColor>>(color: C) -> ShapeStyle {
    ShapeStyle {
        color: color.into(),
        filled: true,
        stroke_width: 0,
    }
}

/// Maps displacement magnitudes onto a color gradient.
pub struct Colorbar<T: Gradient> {
    min: f64,
    max: f64,
    gradient: T,
}

impl<T: Gradient> Colorbar<T> {
    pub fn new(min: f64, max: f64, gradient: T) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
            gradient,
        }
    }

    pub fn color(&self, value: f64) -> RGBColor {
        let value = value.clamp(self.min, self.max);
        let span = self.max - self.min;
        let scaled = if span > 0.0 {
            (value - self.min) / span
        } else {
            0.0
        };
        let rgba = self.gradient.at(scaled as f32).to_rgba8();
        RGBColor(rgba[0], rgba[1], rgba[2])
    }

    pub fn draw<DB: DrawingBackend>(&self, mut chart_builder: ChartBuilder<DB>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let &Self { min, max, .. } = self;
        let max = if max > min { max } else { min + 1.0 };
        let step = (max - min) / 255.0;
        let mut chart_context = chart_builder
            .margin_top(10)
            .margin_right(15)
            .x_label_area_size(25)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..1.0, min..max)?;
        chart_context
            .configure_mesh()
            .set_all_tick_mark_size(5)
            .disable_x_axis()
            .disable_x_mesh()
            .disable_y_mesh()
            .y_desc("|d|")
            .axis_style(BLACK)
            .label_style(("sans-serif", 14).into_font().color(&BLACK))
            .draw()?;
        chart_context.draw_series((0..256).map(|i| {
            let value = min + i as f64 * step;
            Rectangle::new(
                [(0.0, value), (1.0, value + step)],
                filled_style(self.color(value)),
            )
        }))?;
        Ok(())
    }
}
