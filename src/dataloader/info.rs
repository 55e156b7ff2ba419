use tracing::info;

use super::generator::VolumeBatchGenerator;

pub fn log_dataset_info(generator: &VolumeBatchGenerator) {
    let total_size = generator.sample_count();
    let batch_size = generator.batch_size();
    let catalog = generator.catalog();

    let last_batch_size = match total_size % batch_size {
        0 => batch_size,
        rest => rest,
    };

    info!(
        total_size,
        batch_size,
        batches = generator.batch_count(),
        last_batch_size,
        "dataset"
    );
    info!(
        dimensions = ?catalog.sample_box_dimensions(),
        channels = catalog.channel_count(),
        use_image = catalog.use_image(),
        use_mask = catalog.use_mask(),
        mask_as_extra_channel = catalog.mask_as_extra_channel(),
        "sample layout"
    );
    info!(
        in_ram = generator.is_in_ram(),
        seed = generator.seed(),
        ordering = ?generator.ordering_mode(),
        "ordering"
    );
}
