mod heatmap;
