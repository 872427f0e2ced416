pub mod gsv_collect;
